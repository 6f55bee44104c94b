// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash erase/program using RP2040 ROM routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash, and no
//! interrupt handler (which lives in flash) may run in between. The RAM
//! routines below are therefore only reachable with a critical section held.

use critical_section::CriticalSection;
use hexfeed_common::layout::{
    ADDRESSABLE_END, APP_BASE_OFFSET, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, WORD_SIZE,
};
use hexfeed_common::FlashProgrammer;

/// 4KB sector erase command, matching the block size passed to the ROM.
const SECTOR_ERASE_CMD: u8 = 0x20;

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Initialize ROM flash function pointers. Must be called once before any flash operations.
/// This performs ROM table lookups which require XIP to be active.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Erase `size` bytes at a sector-aligned flash-relative offset.
///
/// # Safety
/// `init()` must have been called, and interrupts must be disabled.
#[link_section = ".data"]
#[inline(never)]
unsafe fn erase_range(offset: u32, size: u32) {
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
}

/// Program whole pages at a page-aligned flash-relative offset.
///
/// # Safety
/// `init()` must have been called, and interrupts must be disabled.
#[link_section = ".data"]
#[inline(never)]
unsafe fn program_range(offset: u32, data: *const u8, len: usize) {
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
}

/// [`FlashProgrammer`] backed by the boot ROM.
pub struct RomFlash {
    _private: (),
}

impl RomFlash {
    /// `init()` must have been called first.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl FlashProgrammer for RomFlash {
    fn erase_sectors(&mut self, base: u32, count: u32) {
        defmt::println!("Erasing {} sectors at 0x{:08x}", count, base);

        // One sector per critical section keeps the RX interrupt latency bounded.
        for sector in 0..count {
            let offset = base + sector * FLASH_SECTOR_SIZE;
            critical_section::with(|_cs| unsafe { erase_range(offset, FLASH_SECTOR_SIZE) });
        }
    }

    fn program_word(&mut self, _cs: CriticalSection<'_>, address: u32, word: [u8; WORD_SIZE]) {
        // The session already refuses records outside its configured region.
        // This only catches a configuration that reaches into the bootloader.
        if address < APP_BASE_OFFSET || address + WORD_SIZE as u32 > ADDRESSABLE_END {
            defmt::error!("Refusing write at 0x{:08x} (outside application region)", address);
            return;
        }

        // The ROM programs whole pages. Everything outside the word stays 0xFF,
        // which leaves already programmed bytes untouched. A word may straddle
        // two pages.
        let mut done = 0;
        while done < WORD_SIZE {
            let addr = address + done as u32;
            let page_base = addr & !(FLASH_PAGE_SIZE - 1);
            let in_page = (addr - page_base) as usize;
            let n = (WORD_SIZE - done).min(FLASH_PAGE_SIZE as usize - in_page);

            let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
            page[in_page..in_page + n].copy_from_slice(&word[done..done + n]);
            unsafe { program_range(page_base, page.as_ptr(), page.len()) };

            done += n;
        }
    }
}

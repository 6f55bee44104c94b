// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash layout and wire constants shared by the bootloader, the sample
//! application and the host tool.
//!
//! S-record addresses are flash-relative offsets: a record for `0xA000` lands at
//! `FLASH_BASE + 0xA000`. The 2-byte address field of an S1 record therefore
//! reaches the first 64KB of flash only.

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Application base, as a flash-relative offset.
pub const APP_BASE_OFFSET: u32 = 0x0000_A000;
/// Application base, as an absolute XIP address.
pub const APP_BASE_ADDR: u32 = FLASH_BASE + APP_BASE_OFFSET;

/// Highest offset reachable by a 2-byte record address, plus one.
pub const ADDRESSABLE_END: u32 = 0x0001_0000;

/// Sectors erased before an update (everything from the application base up to
/// the end of the addressable window).
pub const ERASE_SECTOR_COUNT: u32 = (ADDRESSABLE_END - APP_BASE_OFFSET) / FLASH_SECTOR_SIZE;

pub const SRAM_START: u32 = 0x2000_0000;
pub const SRAM_END: u32 = 0x2004_2000;

// --- Serial line ---

pub const UART_BAUD: u32 = 115_200;
pub const LINE_TERMINATOR: u8 = b'\n';

// --- Record queue ---

/// Capacity of one raw line slot, terminator included.
pub const MAX_LINE_LEN: usize = 80;
/// Number of slots in the record queue.
pub const QUEUE_SLOTS: usize = 4;

// --- S-record ---

pub const RECORD_MARKER: u8 = b'S';
pub const WORD_SIZE: usize = 4;
pub const MAX_DATA_GROUPS: usize = 4;
pub const MAX_DATA_BYTES: usize = WORD_SIZE * MAX_DATA_GROUPS;
/// A data record without payload: 2 address bytes + 1 checksum byte.
pub const MIN_BYTE_COUNT: u8 = 3;

// Compile-time layout checks
const _: () = assert!(APP_BASE_OFFSET % FLASH_SECTOR_SIZE == 0);
const _: () = assert!(ERASE_SECTOR_COUNT > 0);
const _: () = assert!(MAX_LINE_LEN > 10 + 2 * MAX_DATA_BYTES);

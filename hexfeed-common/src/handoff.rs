// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application handoff ABI.
//!
//! The application image starts with a Cortex-M vector table: word 0 is the
//! initial stack pointer, word 1 the reset vector. The bootloader reads both from
//! the application base and never returns once it branches.

use crate::layout::{ADDRESSABLE_END, APP_BASE_ADDR, FLASH_BASE, SRAM_END, SRAM_START};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    /// Decode the first two little-endian words of an image.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        let [a, b, c, d, e, f, g, h] = bytes;
        Self {
            initial_sp: u32::from_le_bytes([a, b, c, d]),
            reset_vector: u32::from_le_bytes([e, f, g, h]),
        }
    }

    /// Read the vector table at an absolute address via volatile reads.
    ///
    /// # Safety
    /// `addr` must point to readable, word-aligned memory of at least 8 bytes.
    pub unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// Stack pointer in SRAM and a Thumb reset vector inside the application
    /// region. Erased flash (`0xFFFF_FFFF`) fails both.
    pub fn is_plausible(&self) -> bool {
        let sp_ok = (SRAM_START..=SRAM_END).contains(&self.initial_sp) && self.initial_sp % 4 == 0;
        let entry = self.reset_vector & !1;
        let entry_ok = self.reset_vector & 1 == 1
            && (APP_BASE_ADDR..FLASH_BASE + ADDRESSABLE_END).contains(&entry);
        sp_ok && entry_ok
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMode {
    /// Run an update session.
    Update,
    /// Jump straight to the application.
    Application(VectorTable),
}

/// Pick the boot path: update when the trigger is asserted or when no
/// application is present, otherwise hand off.
pub fn select_boot_mode(trigger_asserted: bool, app: VectorTable) -> BootMode {
    if trigger_asserted || !app.is_plausible() {
        BootMode::Update
    } else {
        BootMode::Application(app)
    }
}

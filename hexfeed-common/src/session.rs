// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update session state machine - pure logic over injected collaborators.
//!
//! ```text
//! Idle --trigger--> Erasing --erased--> Receiving --S9--> Completed
//!   |                                       |
//!   +--no trigger--> ApplicationHandoff     +--bad record--> Failed
//! ```
//!
//! A bad record is one that fails validation, lies outside
//! `[app_base, app_end)`, or arrived with the queue's overrun mark.
//!
//! Flash, console and LED are passed in, so the whole session runs on the host
//! against mocks. Halting and the jump to the application are left to the
//! caller once a terminal state is returned.

use core::fmt::Write;

use critical_section::CriticalSection;
use embedded_hal::digital::OutputPin;

use crate::layout::{ADDRESSABLE_END, APP_BASE_OFFSET, ERASE_SECTOR_COUNT, MIN_BYTE_COUNT, WORD_SIZE};
use crate::queue::RecordQueue;
use crate::srec::{self, Record, RecordError, RecordKind};

// --- Status text sent back on the serial line ---

pub const MSG_BANNER: &str = " \n |***************** BOOTLOADER *****************|\r\n Preparing............\r\n";
pub const MSG_ERASING: &str = " Formatting data:";
pub const MSG_ERASED: &str = ".....................done!\r\n \n";
/// Sent once the queue is ready; the host may start streaming after this.
pub const MSG_READY: &str = " Please update SREC (file format) now !\r\n Updating your firmware: ";
/// Sent after each programmed data record.
pub const MSG_PROGRESS: &str = ".";
pub const MSG_FAILED: &str = "Update failed\r\nPlease start over from the beginning!\r\n";
pub const MSG_COMPLETED: &str = ".done!\r\n  \n           +++++++++++++++++++++++++++++\n  \n Please press the Reset Button to run the Application. Thanks :)\r\n";

/// Flash erase/program primitives.
///
/// Addresses are flash-relative offsets. Both operations are synchronous and
/// treated as infallible.
pub trait FlashProgrammer {
    /// Erase `count` sectors starting at `base`.
    fn erase_sectors(&mut self, base: u32, count: u32);

    /// Program one aligned word into erased flash. The token proves interrupts
    /// are disabled for the duration of the write.
    fn program_word(&mut self, cs: CriticalSection<'_>, address: u32, word: [u8; WORD_SIZE]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Idle,
    Erasing,
    Receiving,
    Completed,
    Failed(RecordError),
    ApplicationHandoff,
}

impl SessionState {
    /// No further transition happens from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed(_) | Self::ApplicationHandoff
        )
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    /// Flash-relative offset of the application image. Records below it fail
    /// the session.
    pub app_base: u32,
    /// End (exclusive) of the writable region.
    pub app_end: u32,
    pub erase_sectors: u32,
    /// Data records below this byte count fail the session.
    pub min_byte_count: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_base: APP_BASE_OFFSET,
            app_end: ADDRESSABLE_END,
            erase_sectors: ERASE_SECTOR_COUNT,
            min_byte_count: MIN_BYTE_COUNT,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    pub records_programmed: u32,
    pub words_written: u32,
    /// Lines with a record type other than data or end.
    pub records_ignored: u32,
}

pub struct UpdateSession<'q, F, C, L, const SLOTS: usize, const LEN: usize> {
    queue: &'q RecordQueue<SLOTS, LEN>,
    flash: F,
    console: C,
    led: L,
    config: SessionConfig,
    state: SessionState,
    stats: SessionStats,
}

impl<'q, F, C, L, const SLOTS: usize, const LEN: usize> UpdateSession<'q, F, C, L, SLOTS, LEN>
where
    F: FlashProgrammer,
    C: Write,
    L: OutputPin,
{
    pub fn new(queue: &'q RecordQueue<SLOTS, LEN>, flash: F, console: C, led: L) -> Self {
        Self::with_config(queue, flash, console, led, SessionConfig::default())
    }

    pub fn with_config(
        queue: &'q RecordQueue<SLOTS, LEN>,
        flash: F,
        console: C,
        led: L,
        config: SessionConfig,
    ) -> Self {
        Self {
            queue,
            flash,
            console,
            led,
            config,
            state: SessionState::Idle,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn led_mut(&mut self) -> &mut L {
        &mut self.led
    }

    /// Give back the collaborators.
    pub fn into_parts(self) -> (F, C, L) {
        (self.flash, self.console, self.led)
    }

    /// Leave Idle according to the trigger input sampled at startup.
    pub fn start(&mut self, trigger_asserted: bool) -> SessionState {
        if self.state != SessionState::Idle {
            return self.state;
        }

        self.state = if trigger_asserted {
            self.led.set_high().ok();
            self.say(MSG_BANNER);
            SessionState::Erasing
        } else {
            SessionState::ApplicationHandoff
        };
        self.state
    }

    /// Erase the application region and open the queue for records.
    pub fn erase(&mut self) -> SessionState {
        if self.state != SessionState::Erasing {
            return self.state;
        }

        self.say(MSG_ERASING);
        self.flash
            .erase_sectors(self.config.app_base, self.config.erase_sectors);
        self.say(MSG_ERASED);

        self.queue.reset_all();
        self.say(MSG_READY);

        self.state = SessionState::Receiving;
        self.state
    }

    /// Scan every slot once, in index order, consuming the full ones.
    ///
    /// Stops at the first slot that ends the session.
    pub fn poll(&mut self) -> SessionState {
        if self.state != SessionState::Receiving {
            return self.state;
        }

        for index in 0..SLOTS {
            let Some(line) = self.queue.read_line(index) else {
                continue;
            };
            self.state = if self.queue.is_overrun(index) {
                // The head of the line is lost; its type cannot be trusted.
                self.queue.mark_empty(index);
                self.fail(RecordError::Overrun)
            } else {
                self.consume(index, &line)
            };
            if self.state.is_terminal() {
                break;
            }
        }
        self.state
    }

    /// Drive the session from Idle to a terminal state.
    pub fn run(&mut self, trigger_asserted: bool) -> SessionState {
        self.start(trigger_asserted);
        self.erase();
        while self.state == SessionState::Receiving {
            self.poll();
        }
        self.state
    }

    fn consume(&mut self, index: usize, line: &[u8]) -> SessionState {
        match RecordKind::of(line) {
            Some(RecordKind::Data) => {
                let result = self.program(line);
                self.queue.mark_empty(index);
                match result {
                    Ok(()) => {
                        self.say(MSG_PROGRESS);
                        SessionState::Receiving
                    }
                    Err(error) => self.fail(error),
                }
            }
            Some(RecordKind::End) => {
                self.queue.mark_empty(index);
                self.say(MSG_COMPLETED);
                SessionState::Completed
            }
            _ => {
                self.queue.mark_empty(index);
                self.stats.records_ignored += 1;
                SessionState::Receiving
            }
        }
    }

    fn program(&mut self, line: &[u8]) -> Result<(), RecordError> {
        let byte_count = srec::validate(line)?;
        if byte_count < self.config.min_byte_count {
            return Err(RecordError::ByteCountTooSmall(byte_count));
        }
        let record = Record::parse(line, byte_count)?;

        // Checked up front so a record is either written whole or not at all.
        let end = record.address + (record.groups().len() * WORD_SIZE) as u32;
        if record.address < self.config.app_base || end > self.config.app_end {
            return Err(RecordError::AddressOutOfRange(record.address));
        }

        for (address, word) in record.words() {
            let flash = &mut self.flash;
            critical_section::with(|cs| flash.program_word(cs, address, word));
            self.stats.words_written += 1;
        }
        self.stats.records_programmed += 1;

        Ok(())
    }

    fn fail(&mut self, error: RecordError) -> SessionState {
        self.say(MSG_FAILED);
        SessionState::Failed(error)
    }

    fn say(&mut self, msg: &str) {
        self.console.write_str(msg).ok();
    }
}

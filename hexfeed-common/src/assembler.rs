// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Interrupt-context line assembler: the record queue's only producer.
//!
//! Bytes are appended to the slot the assembler currently owns until a line
//! terminator publishes it. Every call is constant time and allocation free.
//!
//! Overflow handling:
//! - when no slot is free at the start of a line, the whole line is discarded
//!   up to its terminator and counted in `dropped_lines`. A slot that has not
//!   been handed back by the consumer is never written.
//! - a line reaching `LEN - 1` bytes restarts from offset 0 (counted in
//!   `overruns`). The tail is still published at the terminator, but with the
//!   slot's overrun mark set, so the consumer fails on it without decoding.

use crate::layout::LINE_TERMINATOR;
use crate::queue::RecordQueue;

/// What a single byte did to the producer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushOutcome {
    /// Byte appended to the current slot.
    Stored,
    /// Terminator received, the slot at this index is now full.
    Published(usize),
    /// Line reached slot capacity and restarted from offset 0.
    Overrun,
    /// Byte belongs to a line being dropped for lack of a free slot.
    Discarded,
    /// Terminator of a dropped line.
    Dropped,
}

/// Producer-side counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProducerStats {
    pub published: u32,
    pub dropped_lines: u32,
    pub overruns: u32,
}

pub struct LineAssembler<'q, const SLOTS: usize, const LEN: usize> {
    queue: &'q RecordQueue<SLOTS, LEN>,
    current: Option<usize>,
    discarding: bool,
    /// The line in `current` has restarted at least once.
    overrun: bool,
    stats: ProducerStats,
}

impl<'q, const SLOTS: usize, const LEN: usize> LineAssembler<'q, SLOTS, LEN> {
    pub(crate) fn new(queue: &'q RecordQueue<SLOTS, LEN>) -> Self {
        Self {
            queue,
            current: None,
            discarding: false,
            overrun: false,
            stats: ProducerStats::default(),
        }
    }

    /// Feed one received byte.
    pub fn push_byte(&mut self, byte: u8) -> PushOutcome {
        if self.current.is_none() && !self.discarding {
            self.current = self.acquire();
            self.discarding = self.current.is_none();
        }

        let Some(index) = self.current else {
            if byte == LINE_TERMINATOR {
                self.discarding = false;
                self.stats.dropped_lines += 1;
                return PushOutcome::Dropped;
            }
            return PushOutcome::Discarded;
        };

        if byte == LINE_TERMINATOR {
            self.queue.mark_full(index, self.overrun);
            self.overrun = false;
            self.stats.published += 1;
            self.current = self.acquire();
            return PushOutcome::Published(index);
        }

        // SAFETY: `index` was empty when acquired and only this producer marks it full.
        let line = unsafe { self.queue.line_mut(index) };
        // Never fails: the line is restarted before it reaches capacity.
        let _ = line.push(byte);
        if line.len() >= LEN - 1 {
            line.clear();
            self.overrun = true;
            self.stats.overruns += 1;
            return PushOutcome::Overrun;
        }

        PushOutcome::Stored
    }

    /// Feed a run of bytes, e.g. a drained UART FIFO.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push_byte(byte);
        }
    }

    /// Slot currently being written, if any.
    pub fn current_slot(&self) -> Option<usize> {
        self.current
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    fn acquire(&self) -> Option<usize> {
        let index = self.queue.find_empty_slot()?;
        // SAFETY: the slot reads empty, so the consumer has released it.
        unsafe { self.queue.line_mut(index).clear() };
        Some(index)
    }
}

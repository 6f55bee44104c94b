// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Fixed-capacity record queue shared between the UART interrupt and the
//! foreground update loop.
//!
//! Each slot holds one raw, unparsed line and a full/empty flag. The flag is the
//! only synchronization between the two contexts:
//! - the producer ([`LineAssembler`]) writes a slot's content only while the
//!   flag reads empty, and sets the flag (Release) as its last action on it;
//! - the consumer reads a slot's content only after observing the flag full
//!   (Acquire), and hands the slot back by clearing the flag.
//!
//! The consumer copies a line out before clearing its flag, so no borrow of
//! slot content outlives its ownership.
//!
//! A slot published after an overrun carries an overrun mark. Its content is
//! only the restarted tail of the line and must not be trusted.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;

use crate::assembler::LineAssembler;

/// A raw line copied out of a queue slot.
pub type Line<const LEN: usize> = Vec<u8, LEN>;

struct Slot<const LEN: usize> {
    line: UnsafeCell<Line<LEN>>,
    full: AtomicBool,
    overrun: AtomicBool,
}

impl<const LEN: usize> Slot<LEN> {
    const fn new() -> Self {
        Self {
            line: UnsafeCell::new(Vec::new()),
            full: AtomicBool::new(false),
            overrun: AtomicBool::new(false),
        }
    }

    fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }
}

/// Record queue of `SLOTS` line slots of `LEN` bytes each.
pub struct RecordQueue<const SLOTS: usize, const LEN: usize> {
    slots: [Slot<LEN>; SLOTS],
    producer_taken: AtomicBool,
}

// SAFETY: slot content is written only through the single `LineAssembler`
// handed out by `producer()`, and only while the slot flag reads empty. The
// consumer side reads content only while the flag reads full.
unsafe impl<const SLOTS: usize, const LEN: usize> Sync for RecordQueue<SLOTS, LEN> {}

impl<const SLOTS: usize, const LEN: usize> RecordQueue<SLOTS, LEN> {
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; SLOTS],
            producer_taken: AtomicBool::new(false),
        }
    }

    pub const fn capacity(&self) -> usize {
        SLOTS
    }

    /// Take the producer handle. Returns `None` if it was already taken.
    pub fn producer(&self) -> Option<LineAssembler<'_, SLOTS, LEN>> {
        let taken = critical_section::with(|_cs| {
            let taken = self.producer_taken.load(Ordering::Relaxed);
            self.producer_taken.store(true, Ordering::Relaxed);
            taken
        });

        if taken {
            None
        } else {
            Some(LineAssembler::new(self))
        }
    }

    /// First empty slot in index order, or `None` if every slot is full.
    pub fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.is_full())
    }

    pub fn is_full(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Slot::is_full)
    }

    /// Number of slots currently published and awaiting the consumer.
    pub fn full_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_full()).count()
    }

    /// Hand a slot over to the consumer. Producer side only.
    pub(crate) fn mark_full(&self, index: usize, overrun: bool) {
        if let Some(slot) = self.slots.get(index) {
            slot.overrun.store(overrun, Ordering::Relaxed);
            slot.full.store(true, Ordering::Release);
        }
    }

    /// Whether the full slot at `index` holds the tail of an overrun line.
    pub fn is_overrun(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.is_full() && slot.overrun.load(Ordering::Relaxed))
    }

    /// Hand a slot back to the producer.
    pub fn mark_empty(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            slot.full.store(false, Ordering::Release);
        }
    }

    /// Mark every slot empty, discarding any pending lines.
    pub fn reset_all(&self) {
        for slot in &self.slots {
            slot.full.store(false, Ordering::Release);
        }
    }

    /// Copy out the line held by a full slot. The slot stays full.
    pub fn read_line(&self, index: usize) -> Option<Line<LEN>> {
        let slot = self.slots.get(index)?;
        if !slot.is_full() {
            return None;
        }
        // SAFETY: the flag reads full, so the producer no longer touches this slot
        // until the consumer clears it.
        Some(unsafe { (*slot.line.get()).clone() })
    }

    /// Pop the front slot and move every later full slot one position toward
    /// the front, content and flag together.
    ///
    /// Requires exclusive access, so it cannot run while a producer handle is
    /// alive. Returns the popped line, or `None` if slot 0 was empty.
    pub fn compact_from_front(&mut self) -> Option<Line<LEN>> {
        let front = self.slots.first_mut()?;
        if !*front.full.get_mut() {
            return None;
        }
        *front.full.get_mut() = false;
        let popped = core::mem::take(front.line.get_mut());

        for i in 1..SLOTS {
            if !*self.slots[i].full.get_mut() {
                continue;
            }
            // Slot i - 1 is empty here: it was either the popped front or moved
            // forward on the previous step.
            let (head, tail) = self.slots.split_at_mut(i);
            let (prev, cur) = (&mut head[i - 1], &mut tail[0]);
            core::mem::swap(prev.line.get_mut(), cur.line.get_mut());
            *prev.overrun.get_mut() = *cur.overrun.get_mut();
            *prev.full.get_mut() = true;
            *cur.full.get_mut() = false;
        }

        Some(popped)
    }

    /// Mutable access to a slot's line buffer.
    ///
    /// # Safety
    /// Caller must be the queue's only producer and the slot flag must read empty.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn line_mut(&self, index: usize) -> &mut Line<LEN> {
        &mut *self.slots[index].line.get()
    }
}

impl<const SLOTS: usize, const LEN: usize> Default for RecordQueue<SLOTS, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

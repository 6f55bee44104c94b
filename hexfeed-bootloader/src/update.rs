// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial update mode.
//!
//! The UART0 RX interrupt is the record queue's only producer: it drains the RX
//! FIFO into the line assembler. The foreground loop runs the update session
//! over the same queue until the session ends, then halts until reset.

use core::cell::RefCell;

use critical_section::Mutex;
use hexfeed_common::layout::{MAX_LINE_LEN, QUEUE_SLOTS};
use hexfeed_common::{
    DefaultQueue, LineAssembler, ProducerStats, SessionState, SessionStats, UpdateSession,
};
use rp2040_hal as hal;
use rp2040_hal::pac::interrupt;

use crate::flash::RomFlash;
use crate::peripherals::{Peripherals, UartReader};

/// Size of the buffer used to empty the 32-byte RX FIFO.
const RX_CHUNK: usize = 32;

static QUEUE: DefaultQueue = DefaultQueue::new();

/// Installed once before the interrupt is unmasked.
static RX: Mutex<RefCell<Option<RxState>>> = Mutex::new(RefCell::new(None));

struct RxState {
    reader: UartReader,
    producer: LineAssembler<'static, QUEUE_SLOTS, MAX_LINE_LEN>,
    read_errors: u32,
}

impl RxState {
    /// Move everything waiting in the RX FIFO into the line assembler.
    fn drain(&mut self) {
        let mut buf = [0u8; RX_CHUNK];
        loop {
            match self.reader.read_raw(&mut buf) {
                Ok(0) | Err(nb::Error::WouldBlock) => break,
                Ok(n) => self.producer.push_bytes(&buf[..n]),
                Err(nb::Error::Other(err)) => {
                    // Bytes ahead of the faulty one are good. The faulty one is
                    // lost and its line will fail validation.
                    self.producer.push_bytes(err.discarded);
                    self.read_errors += 1;
                }
            }
        }
    }
}

#[interrupt]
fn UART0_IRQ() {
    critical_section::with(|cs| {
        if let Some(rx) = RX.borrow_ref_mut(cs).as_mut() {
            rx.drain();
        }
    });
}

/// Enter update mode: arm the RX interrupt and run the session to its end.
pub fn enter_update_mode(p: Peripherals) -> ! {
    defmt::println!("Update mode requested");

    let Peripherals {
        led_pin,
        mut timer,
        mut uart,
        ..
    } = p;

    uart.enable_rx_interrupt();
    let (reader, writer) = uart.split();

    let producer = QUEUE
        .producer()
        .expect("record queue producer already taken");
    critical_section::with(|cs| {
        RX.borrow_ref_mut(cs).replace(RxState {
            reader,
            producer,
            read_errors: 0,
        });
    });
    unsafe {
        hal::pac::NVIC::unmask(hal::pac::Interrupt::UART0_IRQ);
    }

    let mut session = UpdateSession::new(&QUEUE, RomFlash::new(), writer, led_pin);
    let state = session.run(true);

    hal::pac::NVIC::mask(hal::pac::Interrupt::UART0_IRQ);
    log_session_end(state, session.stats());

    match state {
        SessionState::Failed(_) => {
            let (_, _, mut led_pin) = session.into_parts();
            loop {
                hexfeed_common::blink(&mut led_pin, &mut timer, 1, 50);
            }
        }
        // Completed: LED stays on, the operator resets to run the application.
        _ => loop {
            cortex_m::asm::wfi();
        },
    }
}

fn log_session_end(state: SessionState, stats: SessionStats) {
    let (producer, read_errors) = critical_section::with(|cs| {
        RX.borrow_ref(cs)
            .as_ref()
            .map(|rx| (rx.producer.stats(), rx.read_errors))
            .unwrap_or((ProducerStats::default(), 0))
    });

    match state {
        SessionState::Completed => defmt::println!("Update completed"),
        SessionState::Failed(err) => defmt::error!("Update failed: {}", err),
        other => defmt::warn!("Session ended in {}", other),
    }
    defmt::println!(
        "Records programmed: {}, words written: {}, ignored: {}",
        stats.records_programmed,
        stats.words_written,
        stats.records_ignored
    );
    defmt::println!(
        "Lines published: {}, dropped: {}, overruns: {}, read errors: {}",
        producer.published,
        producer.dropped_lines,
        producer.overruns,
        read_errors
    );
}

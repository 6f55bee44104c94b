// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

//! Sample application for the hexfeed bootloader.
//!
//! Linked at the application base so its vector table is the one the
//! bootloader jumps through. It only blinks the LED: a visible sign that the
//! handoff worked.

#![no_std]
#![no_main]

use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[entry]
fn main() -> ! {
    defmt::println!("Application started");

    let (mut timer, mut led_pin) = hexfeed_common::init_board();

    // Distinct start pattern: five quick blinks.
    hexfeed_common::blink(&mut led_pin, &mut timer, 5, 100);

    loop {
        led_pin.toggle().ok();
        timer.delay_ms(500u32);
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hexfeed bootloader for RP2040: serial S-record update mode on UART0.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod update;

use defmt_rtt as _;
use embedded_hal::digital::InputPin;
use hexfeed_common::layout::APP_BASE_ADDR;
use hexfeed_common::{select_boot_mode, BootMode, VectorTable};
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();

    hexfeed_common::blink(&mut p.led_pin, &mut p.timer, 3, 200);
    flash::init();

    // Active low, sampled once.
    let trigger_asserted = p.trigger.is_low().unwrap_or(false);
    let app = unsafe { VectorTable::read_from(APP_BASE_ADDR) };
    defmt::println!("Trigger asserted: {}, application: {}", trigger_asserted, app);

    match select_boot_mode(trigger_asserted, app) {
        BootMode::Application(vt) => boot::launch(vt, &mut p.timer),
        BootMode::Update => {
            if !trigger_asserted {
                defmt::println!("No application present, entering update mode");
            }
            update::enter_update_mode(p)
        }
    }
}

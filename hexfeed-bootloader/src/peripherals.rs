// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.

use hexfeed_common::layout::UART_BAUD;
use hexfeed_common::LedPin;
use rp2040_hal as hal;
use rp2040_hal::fugit::RateExtU32;
use rp2040_hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};
use rp2040_hal::Clock;

pub type TriggerPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio2, hal::gpio::FunctionSioInput, hal::gpio::PullUp>;

/// UART0: TX on GP0, RX on GP1.
pub type UartPins = (
    hal::gpio::Pin<hal::gpio::bank0::Gpio0, hal::gpio::FunctionUart, hal::gpio::PullNone>,
    hal::gpio::Pin<hal::gpio::bank0::Gpio1, hal::gpio::FunctionUart, hal::gpio::PullNone>,
);

pub type Uart = UartPeripheral<hal::uart::Enabled, hal::pac::UART0, UartPins>;
pub type UartReader = hal::uart::Reader<hal::pac::UART0, UartPins>;
pub type UartWriter = hal::uart::Writer<hal::pac::UART0, UartPins>;

pub struct Peripherals {
    pub led_pin: LedPin,
    pub trigger: TriggerPin,
    pub timer: hal::Timer,
    pub uart: Uart,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // 8N1 at the fixed line rate.
    let uart_pins: UartPins = (pins.gpio0.reconfigure(), pins.gpio1.reconfigure());
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(UART_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

    Peripherals {
        led_pin: pins.gpio25.into_push_pull_output(),
        trigger: pins.gpio2.into_pull_up_input(),
        timer,
        uart,
    }
}

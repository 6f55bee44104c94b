// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application handoff: vector table relocation and jump.

use embedded_hal::delay::DelayNs;
use hexfeed_common::layout::APP_BASE_ADDR;
use hexfeed_common::VectorTable;
use rp2040_hal as hal;

/// Hand control to the application whose vector table sits at the
/// application base. Never returns.
pub fn launch(vt: VectorTable, timer: &mut hal::Timer) -> ! {
    defmt::println!(
        "Jumping to application: sp=0x{:08x}, entry=0x{:08x}",
        vt.initial_sp,
        vt.reset_vector
    );
    // Let the RTT host pick up the last log lines.
    timer.delay_ms(10u32);

    unsafe {
        prepare_for_application_handoff();
        relocate_vector_table(APP_BASE_ADDR);
        jump_to_application(vt.initial_sp, vt.reset_vector)
    }
}

/// Clocks are left configured; the application's runtime reconfigures them.
unsafe fn prepare_for_application_handoff() {
    // Disable all interrupts
    cortex_m::interrupt::disable();

    // Disable all NVIC interrupts, the UART RX one included
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_application(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // The application runtime expects PRIMASK=0
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}

//! Hard fault demo firmware - Main Entry Point
//!
//! Configures fault reporting, then provokes the fault selected by the
//! `inject-*` features. The HardFault shim in `firmware::exception_handlers`
//! takes it from there.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use hardfault::MmioRegisters;

use firmware::boot::{configure_fault_reporting, log_fault_frame, BOOT_TRAPS};
use firmware::SELECTED_FAULT;

// Logging transport + panic handler
use defmt_rtt as _;
use panic_probe as _;

#[entry]
fn main() -> ! {
    defmt::info!("hardfault demo v{=str}", env!("CARGO_PKG_VERSION"));

    // SAFETY: the SCB is architecturally mapped at SCB_BASE; only thread mode
    // touches it until the fault handler takes over.
    let scb = unsafe { MmioRegisters::scb() };
    configure_fault_reporting(&scb, BOOT_TRAPS, Some(log_fault_frame));

    defmt::info!(
        "injecting {=str} (expect a {=str} fault)",
        SELECTED_FAULT.name(),
        SELECTED_FAULT.expected_category().name()
    );
    let survived = SELECTED_FAULT.trigger();

    defmt::warn!(
        "{=str} did not fault on this target (result {=u32})",
        SELECTED_FAULT.name(),
        survived
    );
    loop {
        cortex_m::asm::wfi();
    }
}

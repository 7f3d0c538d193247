//! HardFault vector for the demo firmware.
//!
//! The vector is a three-instruction assembly shim. It must run before any
//! compiler-generated prologue touches the stack or `lr`, because it forwards
//! exactly the state the core left on exception entry:
//!
//! | Register | Value                        |
//! |----------|------------------------------|
//! | r0       | EXC_RETURN (from `lr`)       |
//! | r1       | MSP                          |
//! | r2       | PSP                          |
//!
//! Stack selection and everything after it is done in Rust by
//! [`hardfault::FaultEntry::enter_from_exception`].
//!
//! The shim defines the `HardFault` symbol itself, which takes precedence over
//! cortex-m-rt's `PROVIDE(HardFault = HardFault_)` default. If the runtime's
//! own trampoline branches here first, `lr` is still EXC_RETURN (it uses `b`,
//! not `bl`), so the shim works either way.
//!
//! # Hardware-only handler
//!
//! The shim and entry need ARM target intrinsics and are gated behind
//! `#[cfg(feature = "hardware")]`. The module itself (and
//! `HARDFAULT_DEFINED`) compiles unconditionally so host tests can verify the
//! module exists without needing an ARM toolchain.

use hardfault::config::DHCSR_C_DEBUGEN;

/// Marker constant: confirmed by host tests to verify this module exists.
///
/// When `HARDFAULT_DEFINED` is `true`, the `exception_handlers` module
/// compiled, so on `hardware` builds the shim below is linked in place of the
/// runtime's default HardFault handler.
pub const HARDFAULT_DEFINED: bool = true;

/// Name of the symbol the shim defines.
pub const HARDFAULT_SYMBOL: &str = "HardFault";

/// Whether a semihosting call will be answered.
///
/// Semihosting traps with `BKPT 0xAB`; with no host attached that trap
/// escalates to lockup before the user hook runs. QEMU always answers
/// (`emulated`); on silicon an attached debugger shows in DHCSR.C_DEBUGEN.
#[must_use]
pub const fn semihosting_host_present(dhcsr: u32, emulated: bool) -> bool {
    emulated || dhcsr & DHCSR_C_DEBUGEN != 0
}

#[cfg(feature = "hardware")]
pub use hardware::CortexMPlatform;

#[cfg(feature = "hardware")]
mod hardware {
    use hardfault::config::DHCSR_OFFSET;
    use hardfault::{BreakpointPolicy, FaultEntry, MmioRegisters, Platform, RegisterFile};

    use super::semihosting_host_present;

    use crate::sink::SemihostingSink;

    core::arch::global_asm!(
        ".section .text.HardFault,\"ax\",%progbits",
        ".global HardFault",
        ".type HardFault,%function",
        ".thumb_func",
        "HardFault:",
        "mov r0, lr",
        "mrs r1, MSP",
        "mrs r2, PSP",
        "b {entry}",
        entry = sym hard_fault_entry,
    );

    /// Breakpoint and park on a real Cortex-M core.
    pub struct CortexMPlatform;

    impl Platform for CortexMPlatform {
        fn breakpoint(&mut self) {
            cortex_m::asm::bkpt();
        }

        fn park(&mut self) -> ! {
            #[cfg(feature = "qemu-exit")]
            cortex_m_semihosting::debug::exit(cortex_m_semihosting::debug::EXIT_SUCCESS);

            loop {
                cortex_m::asm::wfi();
            }
        }
    }

    /// Rust side of the shim. Never returns.
    ///
    /// # Safety
    ///
    /// Only called by the `HardFault` shim with the registers it forwards.
    unsafe extern "C" fn hard_fault_entry(exc_return: u32, msp: usize, psp: usize) -> ! {
        // SAFETY: the SCB is architecturally mapped at SCB_BASE on every ARMv7-M core.
        let regs = unsafe { MmioRegisters::scb() };
        let emulated = cfg!(feature = "qemu-exit");
        let host = semihosting_host_present(regs.read32(DHCSR_OFFSET), emulated);
        let mut sink = if host {
            SemihostingSink::new()
        } else {
            SemihostingSink::detached()
        };
        let mut platform = CortexMPlatform;

        // SAFETY: exc_return/msp/psp are the live values from exception entry,
        // so the selected stack pointer addresses the hardware-pushed frame.
        unsafe {
            FaultEntry::new(&regs, &mut sink, &mut platform)
                .breakpoint_policy(BreakpointPolicy::IfDebuggerAttached)
                .enter_from_exception(exc_return, msp, psp)
        }
    }
}

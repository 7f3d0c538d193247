//! Boot-time fault reporting setup.
//!
//! Runs once from thread mode before the application starts:
//!   1. Enable the fault traps the report should be able to name
//!      (CCR.DIV_0_TRP, optionally CCR.UNALIGN_TRP)
//!   2. Install the user hook the fault entry calls after the report
//!
//! Both steps are pure register/registry writes, so they are host-testable
//! against `hardfault::mocks::FakeRegisterFile`.

use hardfault::{install_hook, FaultHook, RegisterFile, TrapConfig};

/// Traps enabled by the demo firmware.
///
/// Unaligned trapping stays off: the Rust core library issues unaligned
/// word accesses on ARMv7-M where the architecture allows them.
pub const BOOT_TRAPS: TrapConfig = TrapConfig {
    divide_by_zero: true,
    unaligned: false,
};

/// Apply `traps` to CCR and install `hook`. Returns the CCR value written.
pub fn configure_fault_reporting<R: RegisterFile + ?Sized>(
    regs: &R,
    traps: TrapConfig,
    hook: Option<FaultHook>,
) -> u32 {
    let ccr = traps.apply(regs);

    #[cfg(feature = "defmt")]
    defmt::info!(
        "fault traps: div0={=bool} unaligned={=bool} (CCR={=u32:#010x})",
        traps.divide_by_zero,
        traps.unaligned,
        ccr
    );

    if let Some(hook) = hook {
        let _ = install_hook(hook);
    }
    ccr
}

/// Hook installed by the demo binary: logs the frame address over RTT.
pub fn log_fault_frame(frame_addr: usize) {
    #[cfg(feature = "defmt")]
    defmt::error!("fault frame at {=usize:#010x}", frame_addr);
    #[cfg(not(feature = "defmt"))]
    let _ = frame_addr;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardfault::config::{CCR_DIV_0_TRP, CCR_OFFSET, CCR_UNALIGN_TRP};
    use hardfault::mocks::FakeRegisterFile;

    #[test]
    fn boot_traps_enable_divide_by_zero_only() {
        assert_eq!(BOOT_TRAPS.ccr_bits(), CCR_DIV_0_TRP);
        assert_eq!(BOOT_TRAPS.ccr_bits() & CCR_UNALIGN_TRP, 0);
    }

    #[test]
    fn configure_preserves_other_ccr_bits() {
        // STKALIGN (bit 9) is set out of reset on most ARMv7-M parts.
        let regs = FakeRegisterFile::new().with(CCR_OFFSET, 1 << 9);
        let ccr = configure_fault_reporting(&regs, BOOT_TRAPS, None);
        assert_eq!(ccr, (1 << 9) | CCR_DIV_0_TRP);
        assert_eq!(regs.read32(CCR_OFFSET), ccr);
    }
}

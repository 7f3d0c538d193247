//! Fault-handling configuration and register map constants.
//!
//! Everything here is pure data. Register offsets are relative to the
//! ARMv7-M System Control Block and feed the [`RegisterFile`] accessor;
//! nothing in this module touches hardware directly.
//!
//! # References
//!
//! - ARMv7-M Architecture Reference Manual (DDI0403E) §B3.2: System Control Block
//! - ARMv7-M ARM §C1.6.2: Debug Halting Control and Status Register
//!
//! [`RegisterFile`]: crate::registers::RegisterFile

use crate::registers::RegisterFile;

// ── Register map ─────────────────────────────────────────────────────────────

/// Base address of the System Control Block on every ARMv7-M part.
pub const SCB_BASE: usize = 0xE000_ED00;

/// Configuration and Control Register (trap enables).
pub const CCR_OFFSET: usize = 0x14;

/// Configurable Fault Status Register (UFSR:BFSR:MMFSR).
pub const CFSR_OFFSET: usize = 0x28;

/// HardFault Status Register.
pub const HFSR_OFFSET: usize = 0x2C;

/// MemManage Fault Address Register.
pub const MMFAR_OFFSET: usize = 0x34;

/// BusFault Address Register.
pub const BFAR_OFFSET: usize = 0x38;

/// Debug Halting Control and Status Register (0xE000_EDF0).
///
/// Architecturally part of the debug block, but it sits inside the same 4 KB
/// page so it is addressed from [`SCB_BASE`] like the fault registers.
pub const DHCSR_OFFSET: usize = 0xF0;

// ── Bit masks ────────────────────────────────────────────────────────────────

/// HFSR.FORCED: a configurable fault escalated to HardFault.
pub const HFSR_FORCED: u32 = 1 << 30;

/// CFSR bits belonging to the UsageFault Status Register.
pub const CFSR_USAGE_MASK: u32 = 0xFFFF_0000;

/// CFSR bits belonging to the BusFault Status Register.
pub const CFSR_BUS_MASK: u32 = 0x0000_FF00;

/// CFSR bits belonging to the MemManage Fault Status Register.
pub const CFSR_MEMORY_MASK: u32 = 0x0000_00FF;

/// BFSR.BFARVALID: BFAR holds the faulting address.
pub const CFSR_BFARVALID: u32 = 0x0000_8000;

/// MMFSR.MMARVALID: MMFAR holds the faulting address.
pub const CFSR_MMARVALID: u32 = 0x0000_0080;

/// CCR.UNALIGN_TRP: trap unaligned word/halfword accesses.
pub const CCR_UNALIGN_TRP: u32 = 1 << 3;

/// CCR.DIV_0_TRP: trap SDIV/UDIV with a zero divisor.
pub const CCR_DIV_0_TRP: u32 = 1 << 4;

/// DHCSR.C_DEBUGEN: halting debug is enabled (a debugger is attached).
pub const DHCSR_C_DEBUGEN: u32 = 1 << 0;

// ── Rendering ────────────────────────────────────────────────────────────────

/// Capacity of the single formatted-line buffer used by the reporter.
///
/// The longest formatted line is the BFAR/MMFAR block (~68 bytes). Fixed
/// cause texts are streamed straight to the sink and never buffered.
pub const LINE_CAPACITY: usize = 96;

// ── Trap configuration ───────────────────────────────────────────────────────

/// Optional UsageFault traps enabled through CCR at boot.
///
/// Both traps are off after reset: a divide by zero silently yields 0 and
/// unaligned LDR/STR are performed in hardware. Enabling them turns those
/// silent bugs into `DivideByZero` / `UnalignedAccess` causes in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrapConfig {
    /// Set CCR.DIV_0_TRP.
    pub divide_by_zero: bool,
    /// Set CCR.UNALIGN_TRP.
    pub unaligned: bool,
}

impl TrapConfig {
    /// Both traps enabled.
    pub const ALL: Self = Self {
        divide_by_zero: true,
        unaligned: true,
    };

    /// CCR bits this configuration sets.
    #[must_use]
    pub const fn ccr_bits(self) -> u32 {
        let mut bits = 0;
        if self.divide_by_zero {
            bits |= CCR_DIV_0_TRP;
        }
        if self.unaligned {
            bits |= CCR_UNALIGN_TRP;
        }
        bits
    }

    /// Read-modify-write CCR so the configured traps are enabled.
    ///
    /// Bits outside DIV_0_TRP/UNALIGN_TRP are preserved, and traps that are
    /// already enabled are never cleared. Returns the value written.
    pub fn apply<R: RegisterFile + ?Sized>(self, regs: &R) -> u32 {
        let ccr = regs.read32(CCR_OFFSET) | self.ccr_bits();
        regs.write32(CCR_OFFSET, ccr);
        ccr
    }
}

/// When the fault entry executes a breakpoint before parking.
///
/// A `BKPT` with no debugger attached is itself a fault; taken from inside the
/// HardFault handler it locks the core up instead of parking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BreakpointPolicy {
    /// Never break; go straight to the idle loop.
    Never,
    /// Break only when DHCSR.C_DEBUGEN reports an attached debugger.
    #[default]
    IfDebuggerAttached,
    /// Always break (for targets where DHCSR is not readable by the core).
    Always,
}

impl BreakpointPolicy {
    /// Decide whether to break, given the current DHCSR value.
    #[must_use]
    pub const fn should_break(self, dhcsr: u32) -> bool {
        match self {
            Self::Never => false,
            Self::IfDebuggerAttached => dhcsr & DHCSR_C_DEBUGEN != 0,
            Self::Always => true,
        }
    }
}

//! Fault-status register snapshot.
//!
//! [`HardwareFaultStatus::capture`] reads every register the report needs
//! exactly once. Classification and rendering then work from this value, so
//! a register that changes underneath the handler cannot produce a report
//! that disagrees with itself.

use crate::config::{
    BFAR_OFFSET, CCR_OFFSET, CFSR_BFARVALID, CFSR_MMARVALID, CFSR_OFFSET, HFSR_FORCED,
    HFSR_OFFSET, MMFAR_OFFSET,
};
use crate::registers::RegisterFile;

/// A fault-address register value paired with its hardware validity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultAddressRegister {
    raw: u32,
    valid: bool,
}

impl FaultAddressRegister {
    /// Pair a raw register value with its validity flag.
    #[must_use]
    pub const fn new(raw: u32, valid: bool) -> Self {
        Self { raw, valid }
    }

    /// The faulting address, only when the hardware marked it valid.
    ///
    /// An invalid MMFAR/BFAR may hold a stale address from an earlier fault
    /// or, on some cores, the other register's value (they can share storage).
    #[must_use]
    pub const fn address(self) -> Option<u32> {
        if self.valid {
            Some(self.raw)
        } else {
            None
        }
    }

    /// Register value regardless of validity.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Whether the validity flag was set.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.valid
    }
}

/// Immutable capture of the fault-status registers for one fault episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareFaultStatus {
    hfsr: u32,
    cfsr: u32,
    mmfar: FaultAddressRegister,
    bfar: FaultAddressRegister,
    ccr: u32,
}

impl HardwareFaultStatus {
    /// Read HFSR, CFSR, MMFAR, BFAR and CCR from `regs`.
    ///
    /// CFSR is read first so the validity flags and the address registers
    /// describe the same fault.
    pub fn capture<R: RegisterFile + ?Sized>(regs: &R) -> Self {
        let cfsr = regs.read32(CFSR_OFFSET);
        let hfsr = regs.read32(HFSR_OFFSET);
        let mmfar = regs.read32(MMFAR_OFFSET);
        let bfar = regs.read32(BFAR_OFFSET);
        let ccr = regs.read32(CCR_OFFSET);
        Self::from_raw(hfsr, cfsr, mmfar, bfar).with_ccr(ccr)
    }

    /// Build a snapshot from register values obtained elsewhere (a debugger
    /// session, a test). Validity flags are taken from `cfsr`.
    #[must_use]
    pub const fn from_raw(hfsr: u32, cfsr: u32, mmfar: u32, bfar: u32) -> Self {
        Self {
            hfsr,
            cfsr,
            mmfar: FaultAddressRegister::new(mmfar, cfsr & CFSR_MMARVALID != 0),
            bfar: FaultAddressRegister::new(bfar, cfsr & CFSR_BFARVALID != 0),
            ccr: 0,
        }
    }

    /// Attach the CCR value (trap configuration at fault time).
    #[must_use]
    pub const fn with_ccr(mut self, ccr: u32) -> Self {
        self.ccr = ccr;
        self
    }

    /// Raw HardFault Status Register.
    #[must_use]
    pub const fn hfsr(&self) -> u32 {
        self.hfsr
    }

    /// Raw Configurable Fault Status Register.
    #[must_use]
    pub const fn cfsr(&self) -> u32 {
        self.cfsr
    }

    /// HFSR.FORCED: the hard fault is an escalated configurable fault.
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        self.hfsr & HFSR_FORCED != 0
    }

    /// UsageFault Status Register (CFSR[31:16]).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // shifted field fits the target width
    pub const fn usage_status(&self) -> u16 {
        (self.cfsr >> 16) as u16
    }

    /// BusFault Status Register (CFSR[15:8]).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // shifted field fits the target width
    pub const fn bus_status(&self) -> u8 {
        (self.cfsr >> 8) as u8
    }

    /// MemManage Fault Status Register (CFSR[7:0]).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // shifted field fits the target width
    pub const fn memory_status(&self) -> u8 {
        self.cfsr as u8
    }

    /// MMFAR with its MMARVALID flag.
    #[must_use]
    pub const fn mmfar(&self) -> FaultAddressRegister {
        self.mmfar
    }

    /// BFAR with its BFARVALID flag.
    #[must_use]
    pub const fn bfar(&self) -> FaultAddressRegister {
        self.bfar
    }

    /// Configuration and Control Register at fault time.
    #[must_use]
    pub const fn ccr(&self) -> u32 {
        self.ccr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FakeRegisterFile;

    #[test]
    fn capture_reads_each_register_once() {
        let regs = FakeRegisterFile::new()
            .with_fault(0x4000_0000, 0x0200_8200, 0x1111_1111, 0x2000_0400)
            .with(CCR_OFFSET, 0x0000_0210);
        let status = HardwareFaultStatus::capture(&regs);

        assert_eq!(regs.reads(), 5);
        assert_eq!(regs.writes(), 0);
        assert_eq!(status.hfsr(), 0x4000_0000);
        assert_eq!(status.cfsr(), 0x0200_8200);
        assert_eq!(status.ccr(), 0x0000_0210);
        assert!(status.is_forced());
    }

    #[test]
    fn cfsr_splits_into_sub_registers() {
        let status = HardwareFaultStatus::from_raw(0, 0x0201_8482, 0, 0);
        assert_eq!(status.usage_status(), 0x0201);
        assert_eq!(status.bus_status(), 0x84);
        assert_eq!(status.memory_status(), 0x82);
    }

    #[test]
    fn addresses_hidden_unless_valid() {
        let status = HardwareFaultStatus::from_raw(0, 0x0000_0200, 0xDEAD_BEEF, 0x2000_0000);
        assert_eq!(status.bfar().address(), None);
        assert_eq!(status.mmfar().address(), None);

        let status = HardwareFaultStatus::from_raw(0, 0x0000_8280, 0xDEAD_BEEF, 0x2000_0000);
        assert_eq!(status.bfar().address(), Some(0x2000_0000));
        assert_eq!(status.mmfar().address(), Some(0xDEAD_BEEF));
    }

    #[test]
    fn hfsr_without_bit_30_is_not_forced() {
        // VECTTBL (bit 1) alone: bus fault on vector table read.
        assert!(!HardwareFaultStatus::from_raw(0x0000_0002, 0, 0, 0).is_forced());
    }
}

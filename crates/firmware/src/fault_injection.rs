//! Routines that deliberately crash the core, one per fault class.
//!
//! Flash the demo with one of the `inject-*` features and the HardFault
//! report shows what each class of bug looks like. The metadata
//! ([`FaultKind`]) is plain data and host-testable; the routines themselves
//! only exist on `hardware` builds.
//!
//! Whether a given routine actually faults depends on the memory map: QEMU
//! in particular ignores some writes that real silicon rejects. A routine
//! that survives returns a value so the caller can log that nothing happened.

use hardfault::{FaultCategory, FaultCause};

/// Address written by [`FaultKind::UnmappedWrite`]: 2 MiB past SRAM start,
/// beyond the end of RAM on the lm3s6965 and most small parts.
pub const UNMAPPED_SRAM: usize = 0x2020_0000;

/// Offset from address zero written by [`FaultKind::NullWrite`].
pub const NULL_WRITE_OFFSET: usize = 100;

/// One way to provoke a hard fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Walk a small stack array off the top of RAM.
    StackOverrun,
    /// `SDIV` by zero with CCR.DIV_0_TRP enabled.
    DivideByZero,
    /// Branch to address 0 (Thumb bit clear).
    NullCall,
    /// Store through a pointer near address 0.
    NullWrite,
    /// Store to SRAM addresses that are not backed by memory.
    UnmappedWrite,
}

/// Fault the demo binary provokes, chosen by `inject-*` feature.
#[cfg(feature = "inject-divide-by-zero")]
pub const SELECTED_FAULT: FaultKind = FaultKind::DivideByZero;
/// Fault the demo binary provokes, chosen by `inject-*` feature.
#[cfg(all(feature = "inject-null-call", not(feature = "inject-divide-by-zero")))]
pub const SELECTED_FAULT: FaultKind = FaultKind::NullCall;
/// Fault the demo binary provokes, chosen by `inject-*` feature.
#[cfg(all(
    feature = "inject-null-write",
    not(any(feature = "inject-divide-by-zero", feature = "inject-null-call"))
))]
pub const SELECTED_FAULT: FaultKind = FaultKind::NullWrite;
/// Fault the demo binary provokes, chosen by `inject-*` feature.
#[cfg(all(
    feature = "inject-unmapped-write",
    not(any(
        feature = "inject-divide-by-zero",
        feature = "inject-null-call",
        feature = "inject-null-write"
    ))
))]
pub const SELECTED_FAULT: FaultKind = FaultKind::UnmappedWrite;
/// Fault the demo binary provokes, chosen by `inject-*` feature.
#[cfg(not(any(
    feature = "inject-divide-by-zero",
    feature = "inject-null-call",
    feature = "inject-null-write",
    feature = "inject-unmapped-write"
)))]
pub const SELECTED_FAULT: FaultKind = FaultKind::StackOverrun;

impl FaultKind {
    /// Every routine.
    pub const ALL: [Self; 5] = [
        Self::StackOverrun,
        Self::DivideByZero,
        Self::NullCall,
        Self::NullWrite,
        Self::UnmappedWrite,
    ];

    /// Short name, as used in log lines and `inject-*` feature names.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StackOverrun => "stack-overrun",
            Self::DivideByZero => "divide-by-zero",
            Self::NullCall => "null-call",
            Self::NullWrite => "null-write",
            Self::UnmappedWrite => "unmapped-write",
        }
    }

    /// Category the escalated fault is expected to show up in.
    pub const fn expected_category(self) -> FaultCategory {
        match self {
            Self::DivideByZero | Self::NullCall => FaultCategory::Usage,
            Self::StackOverrun | Self::NullWrite | Self::UnmappedWrite => FaultCategory::Bus,
        }
    }

    /// Cause the report is expected to name, where the core makes it certain.
    ///
    /// Stores may be buffered, so the write-based routines can surface as
    /// either a precise or an imprecise bus error.
    pub const fn expected_cause(self) -> Option<FaultCause> {
        match self {
            Self::DivideByZero => Some(FaultCause::DivideByZero),
            Self::NullCall => Some(FaultCause::InvalidState),
            Self::StackOverrun | Self::NullWrite | Self::UnmappedWrite => None,
        }
    }

    /// Run the routine. Returns only if the core did not fault.
    #[cfg(feature = "hardware")]
    pub fn trigger(self) -> u32 {
        match self {
            Self::StackOverrun => u32::from(routines::stack_overrun()),
            Self::DivideByZero => routines::divide_by_zero(),
            Self::NullCall => {
                routines::call_null();
                0
            }
            Self::NullWrite => u32::from(routines::write_near_null()),
            Self::UnmappedWrite => routines::write_unmapped_sram(),
        }
    }
}

#[cfg(feature = "hardware")]
mod routines {
    use core::hint::black_box;
    use core::ptr;

    use hardfault::{MmioRegisters, TrapConfig};

    use super::{NULL_WRITE_OFFSET, UNMAPPED_SRAM};

    #[inline(never)]
    pub(super) fn stack_overrun() -> u8 {
        let mut array = [0u8; 5];
        let base = array.as_mut_ptr();
        let mut last = 0u8;
        for i in 1..10_000usize {
            #[allow(clippy::cast_possible_truncation)]
            let value = last.wrapping_mul(i as u8);
            // SAFETY: none. This writes past `array` on purpose until the
            // store leaves RAM and the bus faults.
            unsafe { ptr::write_volatile(base.wrapping_add(i), value) };
            last = value;
        }
        black_box(last)
    }

    #[inline(never)]
    pub(super) fn divide_by_zero() -> u32 {
        // SAFETY: the SCB is architecturally mapped at SCB_BASE.
        let scb = unsafe { MmioRegisters::scb() };
        let _ = TrapConfig {
            divide_by_zero: true,
            unaligned: false,
        }
        .apply(&scb);

        let quotient: u32;
        // SAFETY: SDIV has no memory effects; a zero divisor traps with
        // DIV_0_TRP set and yields 0 otherwise.
        unsafe {
            core::arch::asm!(
                "sdiv {q}, {n}, {d}",
                q = lateout(reg) quotient,
                n = in(reg) black_box(4u32),
                d = in(reg) black_box(0u32),
                options(nomem, nostack),
            );
        }
        quotient
    }

    #[inline(never)]
    pub(super) fn call_null() {
        // SAFETY: none. Branching to 0 with the Thumb bit clear raises
        // INVSTATE before any instruction there executes.
        unsafe {
            core::arch::asm!(
                "blx {target}",
                target = in(reg) black_box(0usize),
                clobber_abi("C"),
            );
        }
    }

    #[inline(never)]
    pub(super) fn write_near_null() -> u8 {
        let addr = black_box(NULL_WRITE_OFFSET) as *mut u8;
        // SAFETY: none. Address 100 is in the vector table / flash.
        unsafe {
            ptr::write_volatile(addr, 100);
            ptr::read_volatile(addr)
        }
    }

    #[inline(never)]
    pub(super) fn write_unmapped_sram() -> u32 {
        let base = black_box(UNMAPPED_SRAM) as *mut u32;
        // SAFETY: none. UNMAPPED_SRAM is past the end of RAM.
        unsafe {
            ptr::write_volatile(base.wrapping_add(100), 0xa567_65ae);
            ptr::write_volatile(base.wrapping_add(101), 0xa567_65af);
            let diff = ptr::read_volatile(base.wrapping_add(101))
                .wrapping_sub(ptr::read_volatile(base.wrapping_add(100)));
            ptr::write_volatile(base.wrapping_add(102), diff);
            ptr::read_volatile(base.wrapping_add(102))
        }
    }
}

//! Register accessor abstraction.
//!
//! The classifier and reporter never dereference hardware addresses
//! themselves. They go through [`RegisterFile`], which production code backs
//! with [`MmioRegisters`] (volatile access at the SCB base) and tests back
//! with [`FakeRegisterFile`](crate::mocks::FakeRegisterFile).

use crate::config::SCB_BASE;

/// 32-bit register access by byte offset from a block base address.
///
/// Methods take `&self`: memory-mapped registers are shared hardware state,
/// and the fault handler only ever holds a shared reference to the block.
pub trait RegisterFile {
    /// Read the 32-bit register at `offset`.
    fn read32(&self, offset: usize) -> u32;

    /// Write `value` to the 32-bit register at `offset`.
    fn write32(&self, offset: usize, value: u32);
}

impl<R: RegisterFile + ?Sized> RegisterFile for &R {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }
}

/// Volatile memory-mapped register block.
#[derive(Debug)]
pub struct MmioRegisters {
    base: usize,
}

impl MmioRegisters {
    /// Register block at an arbitrary base address.
    ///
    /// # Safety
    ///
    /// Every offset later passed to [`RegisterFile::read32`] or
    /// [`RegisterFile::write32`] must address a 4-byte aligned location that
    /// is valid for volatile reads and writes for the lifetime of the value.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// The ARMv7-M System Control Block at `0xE000_ED00`.
    ///
    /// # Safety
    ///
    /// Only meaningful on an ARMv7-M core running privileged; on any other
    /// target the returned accessor points at unmapped memory.
    #[must_use]
    pub const unsafe fn scb() -> Self {
        // SAFETY: forwarded to the caller; SCB_BASE is the architectural base.
        unsafe { Self::new(SCB_BASE) }
    }

    /// Base address of the block.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    fn address(&self, offset: usize) -> *mut u32 {
        self.base.wrapping_add(offset) as *mut u32
    }
}

impl RegisterFile for MmioRegisters {
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: the constructor contract guarantees `base + offset` is a
        // valid, aligned register address.
        unsafe { core::ptr::read_volatile(self.address(offset)) }
    }

    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: see `read32`.
        unsafe { core::ptr::write_volatile(self.address(offset), value) }
    }
}

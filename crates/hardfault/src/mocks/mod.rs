//! Mock implementations for testing
//!
//! A fake register file and capturing output sinks, so the whole fault path
//! can run on the host without an ARM core.

#![cfg(any(test, feature = "std"))]

use core::cell::{Cell, RefCell};

use embedded_io::{ErrorKind, ErrorType, Write};
use heapless::LinearMap;

use crate::config::{BFAR_OFFSET, CFSR_OFFSET, HFSR_OFFSET, MMFAR_OFFSET};
use crate::registers::RegisterFile;

/// In-memory register file; unset registers read as zero.
#[derive(Debug, Default)]
pub struct FakeRegisterFile {
    values: RefCell<LinearMap<usize, u32, 16>>,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl FakeRegisterFile {
    /// Empty register file (every register reads 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: preset the register at `offset`.
    ///
    /// Presets beyond the 16-register capacity are ignored.
    pub fn with(self, offset: usize, value: u32) -> Self {
        let _ = self.values.borrow_mut().insert(offset, value);
        self
    }

    /// Preset the four fault registers in one call.
    pub fn with_fault(self, hfsr: u32, cfsr: u32, mmfar: u32, bfar: u32) -> Self {
        self.with(HFSR_OFFSET, hfsr)
            .with(CFSR_OFFSET, cfsr)
            .with(MMFAR_OFFSET, mmfar)
            .with(BFAR_OFFSET, bfar)
    }

    /// Number of `read32` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of `write32` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl RegisterFile for FakeRegisterFile {
    fn read32(&self, offset: usize) -> u32 {
        self.reads.set(self.reads.get().saturating_add(1));
        self.values.borrow().get(&offset).copied().unwrap_or(0)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.writes.set(self.writes.get().saturating_add(1));
        let _ = self.values.borrow_mut().insert(offset, value);
    }
}

/// Sink that keeps everything written to it (up to 4 KB).
#[derive(Debug, Default)]
pub struct CaptureSink {
    bytes: heapless::Vec<u8, 4096>,
    write_calls: usize,
}

impl CaptureSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured output as text (empty if it is not valid UTF-8).
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap_or("")
    }

    /// Number of `write` calls the sink accepted.
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }
}

impl ErrorType for CaptureSink {
    type Error = ErrorKind;
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.bytes
            .extend_from_slice(buf)
            .map_err(|_| ErrorKind::OutOfMemory)?;
        self.write_calls = self.write_calls.saturating_add(1);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Sink that accepts `budget` writes and then fails every later one.
#[derive(Debug)]
pub struct FailingSink {
    budget: usize,
    attempts: usize,
}

impl FailingSink {
    /// Fail after `budget` successful writes.
    pub fn after(budget: usize) -> Self {
        Self {
            budget,
            attempts: 0,
        }
    }

    /// Total writes attempted, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl ErrorType for FailingSink {
    type Error = ErrorKind;
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.attempts = self.attempts.saturating_add(1);
        if self.budget == 0 {
            return Err(ErrorKind::BrokenPipe);
        }
        self.budget = self.budget.saturating_sub(1);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

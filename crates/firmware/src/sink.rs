//! Semihosting console as an `embedded_io` report sink.
//!
//! Semihosting traps into the debugger (or QEMU) with `BKPT 0xAB`, so it is
//! usable from the HardFault handler: no interrupts, no peripheral state.
//! Without a host the trap escalates to lockup and the user hook never runs,
//! so the fault entry builds a [`SemihostingSink::detached`] sink instead
//! whenever [`crate::exception_handlers::semihosting_host_present`] says no.
//! A detached sink fails its first write; the report is dropped and the entry
//! carries on to the hook and the halt.

use cortex_m_semihosting::hio::{self, HostStream};
use embedded_io::{ErrorKind, ErrorType, Write};

/// Host stdout opened lazily on the first write.
pub struct SemihostingSink {
    stream: Option<HostStream>,
    host_present: bool,
}

impl SemihostingSink {
    /// Sink for a core with a semihosting host attached.
    pub const fn new() -> Self {
        Self {
            stream: None,
            host_present: true,
        }
    }

    /// Sink that never traps: every write fails with `NotConnected`.
    pub const fn detached() -> Self {
        Self {
            stream: None,
            host_present: false,
        }
    }

    fn stream(&mut self) -> Result<&mut HostStream, ErrorKind> {
        if !self.host_present {
            return Err(ErrorKind::NotConnected);
        }
        if self.stream.is_none() {
            self.stream = Some(hio::hstdout().map_err(|()| ErrorKind::NotConnected)?);
        }
        self.stream.as_mut().ok_or(ErrorKind::NotConnected)
    }
}

impl Default for SemihostingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for SemihostingSink {
    type Error = ErrorKind;
}

impl Write for SemihostingSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.stream()?
            .write_all(buf)
            .map_err(|()| ErrorKind::Other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

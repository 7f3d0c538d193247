//! Diagnostic report rendering.
//!
//! The report is streamed to an [`embedded_io::Write`] sink as it is built.
//! Fixed texts go straight to the sink; formatted values pass through one
//! bounded [`heapless::String`] line buffer. Nothing allocates: at fault time
//! the heap may be the thing that is corrupted.
//!
//! Report layout:
//!
//! ```text
//! Hard Fault!!!
//! SCB->HFSR = 0x40000000
//! Forced Hard Fault                       ┐
//! SCB->CFSR = 0x00008200                  │ only when HFSR.FORCED
//! Usage fault: <causes>                   │ each category only when
//! Bus fault: 8200 <causes> [BFAR]         │ its CFSR field is non-zero
//! Memory Management (MPU) fault: .. [MMFAR]┘
//!
//! r0  = 0x........   (r0 r1 r2 r3 r12 lr pc psr)
//!
//! --	--	--
//! Hard fault occurred at address 0x........
//! Find high-level function with
//! Disassembly window or Map file
//! --	--	--
//! ```

use core::fmt::{self, Write as _};

use embedded_io::Write;
use heapless::String;
use thiserror_no_std::Error;

use crate::classifier::{CategoryFaults, Classification, FaultCategory, ForcedFault};
use crate::config::LINE_CAPACITY;
use crate::frame::ExceptionStackFrame;

/// First line of every report.
pub const BANNER: &str = "Hard Fault!!!\n";

/// Printed when HFSR.FORCED is set.
pub const FORCED_BANNER: &str = "Forced Hard Fault\n";

/// Closing lines after the fault address.
pub const TRAILER_TAIL: &str =
    "Find high-level function with\nDisassembly window or Map file\n--\t--\t--\n";

/// Why a report could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// A formatted line did not fit the line buffer.
    #[error("formatted line does not fit the line buffer")]
    LineOverflow,
    /// The output sink rejected a write.
    #[error("output sink rejected a write")]
    Sink,
}

/// Renders a [`Classification`] and [`ExceptionStackFrame`] into a sink.
pub struct DiagnosticReporter<'a, W: Write> {
    sink: &'a mut W,
    line: String<LINE_CAPACITY>,
}

impl<'a, W: Write> DiagnosticReporter<'a, W> {
    /// Reporter writing to `sink`.
    pub fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            line: String::new(),
        }
    }

    /// Write the complete report.
    ///
    /// Stops at the first failed write and returns the error; a failed write
    /// is never retried.
    pub fn render(
        &mut self,
        classification: &Classification,
        frame: &ExceptionStackFrame,
    ) -> Result<(), ReportError> {
        self.emit(BANNER)?;
        self.emit_fmt(format_args!(
            "SCB->HFSR = 0x{:08x}\n",
            classification.hfsr()
        ))?;

        if let Some(forced) = classification.forced() {
            self.render_forced(forced)?;
        }

        self.render_registers(frame)?;
        self.render_trailer(frame.fault_address())?;
        self.sink.flush().map_err(|_| ReportError::Sink)
    }

    fn render_forced(&mut self, forced: &ForcedFault) -> Result<(), ReportError> {
        self.emit(FORCED_BANNER)?;
        self.emit_fmt(format_args!("SCB->CFSR = 0x{:08x}\n", forced.cfsr))?;
        for faults in forced.categories() {
            self.render_category(faults)?;
        }
        Ok(())
    }

    fn render_category(&mut self, faults: &CategoryFaults) -> Result<(), ReportError> {
        self.emit(faults.category.heading())?;

        // Bus and MemManage print their masked status; informational only,
        // never cross-checked against the cause list.
        if faults.category != FaultCategory::Usage {
            self.emit_fmt(format_args!("{:02X}\n", faults.status))?;
        }

        for entry in faults.causes.entries() {
            self.emit(entry.text)?;
        }

        match (faults.category, faults.address) {
            (FaultCategory::Bus, Some(address)) => self.emit_fmt(format_args!(
                "Bus Fault Address Register address valid flag\nBFAR value = 0x{address:08X}\n"
            )),
            (FaultCategory::Memory, Some(address)) => self.emit_fmt(format_args!(
                "Memory Manage Address Register address valid flag\nMMFAR value = 0x{address:08X}\n"
            )),
            _ => Ok(()),
        }
    }

    fn render_registers(&mut self, frame: &ExceptionStackFrame) -> Result<(), ReportError> {
        self.emit("\n")?;
        for (name, value) in frame.registers() {
            self.emit_fmt(format_args!("{name} = 0x{value:08x}\n"))?;
        }
        Ok(())
    }

    fn render_trailer(&mut self, fault_address: u32) -> Result<(), ReportError> {
        self.emit_fmt(format_args!(
            "\n--\t--\t--\nHard fault occurred at address 0x{fault_address:08x}.\n"
        ))?;
        self.emit(TRAILER_TAIL)
    }

    fn emit(&mut self, text: &str) -> Result<(), ReportError> {
        self.sink
            .write_all(text.as_bytes())
            .map_err(|_| ReportError::Sink)
    }

    fn emit_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), ReportError> {
        self.line.clear();
        self.line
            .write_fmt(args)
            .map_err(|_| ReportError::LineOverflow)?;
        self.sink
            .write_all(self.line.as_bytes())
            .map_err(|_| ReportError::Sink)
    }
}

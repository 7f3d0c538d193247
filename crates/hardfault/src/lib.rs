//! Hard fault diagnosis for ARMv7-M (Cortex-M3/M4/M7).
//!
//! When a configurable fault escalates, or the core takes a hard fault
//! directly, this crate turns the fault-status registers and the stacked
//! exception frame into a fixed text report, then halts the core where a
//! debugger can pick it up.
//!
//! # Architecture
//!
//! ```text
//! HardFault vector (firmware shim: lr, msp, psp)
//!         ↓
//! FaultEntry         : selects the stack, drives the sequence, halts
//!         ↓
//! HardwareFaultStatus: one-shot register snapshot (via RegisterFile)
//!         ↓
//! classify           : CFSR bits → CauseSet per category (CAUSE_TABLE)
//!         ↓
//! DiagnosticReporter : streams text lines into an embedded-io sink
//! ```
//!
//! Everything above the firmware shim is platform-independent and runs on
//! the host against [`mocks`].
//!
//! # Features
//!
//! - `std`: expose [`mocks`] to other crates' tests
//! - `defmt`: `defmt::Format` derives and a one-line structured fault summary
//!
//! # Example
//!
//! ```
//! use hardfault::{classify, DiagnosticReporter, ExceptionStackFrame, HardwareFaultStatus};
//!
//! # fn main() -> Result<(), hardfault::ReportError> {
//! let status = HardwareFaultStatus::from_raw(0x4000_0000, 0x0200_0000, 0, 0);
//! let frame = ExceptionStackFrame::from_raw([0, 0, 0, 0, 0, 0x0800_0101, 0x0800_0200, 0x0100_0000]);
//!
//! let mut out = [0u8; 1024];
//! let mut sink = &mut out[..];
//! DiagnosticReporter::new(&mut sink).render(&classify(&status), &frame)?;
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // the fault handler must not itself fault
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
// Pedantic lints suppressed for this register-level crate:
#![allow(clippy::doc_markdown)] // register and bit names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod classifier;
pub mod config;
pub mod frame;
pub mod hooks;
pub mod mocks;
pub mod registers;
pub mod report;
pub mod snapshot;
pub mod trampoline;

pub use classifier::{
    classify, classify_bus, classify_memory, classify_usage, CategoryFaults, CauseEntry, CauseSet,
    Classification, FaultCategory, FaultCause, ForcedFault, CAUSE_TABLE,
};
pub use config::{BreakpointPolicy, TrapConfig};
pub use frame::ExceptionStackFrame;
pub use hooks::{install_hook, installed_hook, remove_hook, FaultHook};
pub use registers::{MmioRegisters, RegisterFile};
pub use report::{DiagnosticReporter, ReportError};
pub use snapshot::{FaultAddressRegister, HardwareFaultStatus};
pub use trampoline::{ActiveStack, FaultEntry, Platform};

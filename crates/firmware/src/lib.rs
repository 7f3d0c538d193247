//! Hard fault demo firmware for ARMv7-M
//!
//! Wires the `hardfault` crate to a real core: the HardFault vector shim,
//! a semihosting report sink, breakpoint/park primitives, boot-time trap
//! configuration and a set of routines that provoke each fault class.
//!
//! # Architecture
//!
//! ```text
//! main.rs (boot, then inject one fault)
//!         ↓
//! HardFault vector → exception_handlers (shim: lr, msp, psp)
//!         ↓
//! hardfault::FaultEntry → SemihostingSink / CortexMPlatform
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for a Cortex-M target (cortex-m-rt, semihosting, defmt)
//! - `qemu-exit` - Leave QEMU after the report instead of parking
//! - `inject-*` - Select which fault the demo binary provokes
//!
//! # Examples
//!
//! ## QEMU (lm3s6965evb, Cortex-M3)
//!
//! ```bash
//! cargo run --release --target thumbv7m-none-eabi -p firmware --features hardware,qemu-exit
//! ```
//!
//! ## Host decoder
//!
//! ```bash
//! cargo xtask decode --hfsr 0x40000000 --cfsr 0x00008200 --bfar 0x20020000
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod boot;
pub mod exception_handlers;
pub mod fault_injection;

#[cfg(feature = "hardware")]
pub mod sink;

pub use boot::{configure_fault_reporting, BOOT_TRAPS};
pub use fault_injection::{FaultKind, SELECTED_FAULT};

#[cfg(feature = "hardware")]
pub use exception_handlers::CortexMPlatform;

#[cfg(feature = "hardware")]
pub use sink::SemihostingSink;

// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod decode;
mod flash;
mod qemu;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Firmware build target: Cortex-M3 as emulated by QEMU's lm3s6965evb.
pub const FIRMWARE_TARGET: &str = "thumbv7m-none-eabi";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Cortex-M hard fault reporter development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the fault report from register values read out with a debugger
    Decode(decode::DecodeArgs),
    /// Check the library (host + no_std target) and the firmware build
    Check,
    /// Run all tests (unit, integration, doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Provoke a fault under QEMU and check the report on the semihosting console
    Qemu {
        /// Fault to inject (stack-overrun, divide-by-zero, null-call, null-write, unmapped-write)
        #[arg(long, default_value = "divide-by-zero")]
        fault: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// Echo every console line
        #[arg(short, long)]
        verbose: bool,
    },
    /// Flash the demo firmware to a board via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
        /// probe-rs chip name
        #[arg(long)]
        chip: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(args) => decode::run(&args),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Qemu {
            fault,
            timeout,
            verbose,
        } => qemu::run(&fault, timeout, verbose),
        Commands::Flash { release, chip } => flash::run(release, &chip),
    }
}

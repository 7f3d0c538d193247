//! `cargo xtask qemu`: provoke one fault under QEMU and check the report.
//!
//! Builds the demo firmware with `qemu-exit` and the matching `inject-*`
//! feature, runs it on the lm3s6965evb machine with semihosting routed to
//! stdout, and watches the console for the report's fixed lines.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::FIRMWARE_TARGET;

/// Lines every report contains, in order.
const REPORT_MARKERS: &[&str] = &[
    "Hard Fault!!!",
    "SCB->HFSR = 0x",
    "r0  = 0x",
    "psr = 0x",
    "Hard fault occurred at address 0x",
    "Disassembly window or Map file",
];

/// Fault names accepted by `--fault`, with the heading their report shows.
const FAULTS: &[(&str, &str)] = &[
    ("stack-overrun", "Bus fault: "),
    ("divide-by-zero", "Usage fault: "),
    ("null-call", "Usage fault: "),
    ("null-write", "Bus fault: "),
    ("unmapped-write", "Bus fault: "),
];

/// Recent console lines kept for diagnostics on failure.
const TAIL_LINES: usize = 20;

/// Cargo feature list for `fault`, or an error naming the valid choices.
fn features_for(fault: &str) -> Result<String> {
    if !FAULTS.iter().any(|(name, _)| *name == fault) {
        let names: Vec<&str> = FAULTS.iter().map(|(name, _)| *name).collect();
        bail!("unknown fault `{fault}`; expected one of: {}", names.join(", "));
    }
    if fault == "stack-overrun" {
        Ok("hardware,qemu-exit".to_string())
    } else {
        Ok(format!("hardware,qemu-exit,inject-{fault}"))
    }
}

/// Heading the report for `fault` must contain.
fn expected_heading(fault: &str) -> Option<&'static str> {
    FAULTS
        .iter()
        .find(|(name, _)| *name == fault)
        .map(|(_, heading)| *heading)
}

/// Index of the first marker not yet matched, after feeding `line`.
fn advance(next: usize, line: &str) -> usize {
    match REPORT_MARKERS.get(next) {
        Some(marker) if line.contains(marker) => next.saturating_add(1),
        _ => next,
    }
}

fn build(features: &str) -> Result<PathBuf> {
    println!("{}", format!("  Building firmware ({features})...").cyan());
    let output = Command::new("cargo")
        .args([
            "build",
            "--release",
            "-p",
            "firmware",
            "--target",
            FIRMWARE_TARGET,
            "--features",
            features,
        ])
        .output()
        .context("Failed to run cargo build")?;

    if !output.status.success() {
        eprintln!("{}", "  ✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        bail!("Firmware build failed");
    }

    let elf = PathBuf::from("target")
        .join(FIRMWARE_TARGET)
        .join("release")
        .join("firmware");
    if !elf.exists() {
        bail!("ELF binary not found at {}", elf.display());
    }
    Ok(elf)
}

pub fn run(fault: &str, timeout_secs: u64, verbose: bool) -> Result<()> {
    let features = features_for(fault)?;
    let heading = expected_heading(fault).unwrap_or("fault: ");

    println!();
    println!(
        "{}",
        format!("💥 QEMU fault injection: {fault}").cyan().bold()
    );
    println!();

    let elf = build(&features)?;

    let mut child = Command::new("qemu-system-arm")
        .args([
            "-cpu",
            "cortex-m3",
            "-machine",
            "lm3s6965evb",
            "-nographic",
            "-semihosting-config",
            "enable=on,target=native",
            "-kernel",
        ])
        .arg(&elf)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn qemu-system-arm. Is QEMU installed?")?;

    let stdout = child.stdout.take().context("QEMU stdout not captured")?;

    // Read on a separate thread so a silent, parked core cannot block us.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let timeout = Duration::from_secs(timeout_secs);
    let start = Instant::now();
    let mut next_marker = 0;
    let mut saw_heading = false;
    let mut recent: Vec<String> = Vec::with_capacity(TAIL_LINES);

    loop {
        let Some(remaining) = timeout.checked_sub(start.elapsed()) else {
            eprintln!("{}", format!("  ✗ Timeout after {timeout_secs}s").red());
            break;
        };
        let line = match rx.recv_timeout(remaining.min(Duration::from_secs(1))) {
            Ok(line) => line,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if verbose {
            println!("   {}", line.dimmed());
        }
        if recent.len() >= TAIL_LINES {
            recent.remove(0);
        }
        recent.push(line.clone());

        saw_heading |= line.contains(heading);
        next_marker = advance(next_marker, &line);
    }
    let _ = child.kill();
    let _ = child.wait();

    if next_marker < REPORT_MARKERS.len() || !saw_heading {
        eprintln!("{}", "  ✗ Report incomplete".red().bold());
        if let Some(missing) = REPORT_MARKERS.get(next_marker) {
            eprintln!("     first missing line: \"{missing}\"");
        }
        if !saw_heading {
            eprintln!("     expected heading: \"{heading}\"");
        }
        eprintln!();
        for line in &recent {
            eprintln!("   {line}");
        }
        bail!("QEMU fault report check failed for {fault}");
    }

    println!(
        "{}",
        format!(
            "  ✓ {fault}: full report in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

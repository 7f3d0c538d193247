use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::FIRMWARE_TARGET;

fn elf_path(release: bool) -> String {
    let mode = if release { "release" } else { "debug" };
    format!("target/{FIRMWARE_TARGET}/{mode}/firmware")
}

pub fn run(release: bool, chip: &str) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("🔨 Building firmware ({mode} mode)...").cyan().bold()
    );
    println!();

    let build_start = Instant::now();
    let mut build_cmd = Command::new("cargo");
    build_cmd.args([
        "build",
        "-p",
        "firmware",
        "--target",
        FIRMWARE_TARGET,
        "--features",
        "hardware",
    ]);
    if release {
        build_cmd.arg("--release");
    }

    let build_output = build_cmd.output().context("Failed to run cargo build")?;
    if !build_output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!(
            "✓ Build successful in {:.2}s",
            build_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    println!("{}", format!("📡 Flashing to {chip}...").cyan().bold());
    println!("   {}", "Connecting to probe...".dimmed());

    let flash_start = Instant::now();
    // `probe-rs run` keeps the session open: semihosting output (the fault
    // report) and defmt logs both stream to this terminal.
    let status = Command::new("probe-rs")
        .args(["run", "--chip", chip])
        .arg(elf_path(release))
        .status()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !status.success() {
        anyhow::bail!("probe-rs exited with {status}");
    }
    println!(
        "{}",
        format!(
            "✓ Session ended after {:.2}s",
            flash_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elf_path_follows_profile() {
        assert_eq!(elf_path(true), "target/thumbv7m-none-eabi/release/firmware");
        assert_eq!(elf_path(false), "target/thumbv7m-none-eabi/debug/firmware");
    }
}

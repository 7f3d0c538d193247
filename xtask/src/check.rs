use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::FIRMWARE_TARGET;

/// One `cargo` invocation with its label.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
    /// Failure aborts the run (otherwise it is only reported).
    required: bool,
}

const STEPS: &[Step] = &[
    Step {
        label: "hardfault library (host)",
        args: &["check", "-p", "hardfault", "--all-targets"],
        required: true,
    },
    Step {
        label: "hardfault library (no_std, thumbv7m)",
        args: &["check", "-p", "hardfault", "--target", FIRMWARE_TARGET, "--features", "defmt"],
        required: true,
    },
    Step {
        label: "firmware (thumbv7m, hardware)",
        args: &["check", "-p", "firmware", "--target", FIRMWARE_TARGET, "--features", "hardware"],
        required: true,
    },
    Step {
        label: "clippy lints",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        required: false,
    },
    Step {
        label: "code formatting",
        args: &["fmt", "--all", "--check"],
        required: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking workspace...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", step.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!(
                    "  ✓ {} passed in {:.2}s",
                    step.label,
                    start.elapsed().as_secs_f64()
                )
                .green()
            );
        } else if step.required {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} failed", step.label);
        } else {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Run one `cargo test` invocation and report its summary line.
fn run_suite(label: &str, args: &[&str], required: bool) -> Result<()> {
    println!("{}", format!("  Running {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {label} passed {} in {:.2}s",
                extract_test_summary(&stdout),
                start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else if required {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {line}");
        }
        anyhow::bail!("{label} failed");
    } else {
        eprintln!("{}", format!("  ⚠ {label} failed").yellow().bold());
    }
    println!();
    Ok(())
}

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        run_suite(
            "unit tests",
            &["test", "--lib", "--workspace", "--exclude", "xtask"],
            true,
        )?;
        // xtask's own tests live in its binary target.
        run_suite("xtask tests", &["test", "-p", "xtask", "--bins"], true)?;
    }

    if !unit_only {
        run_suite(
            "integration tests",
            &["test", "--workspace", "--tests", "--exclude", "xtask"],
            true,
        )?;
    }

    run_suite("doc tests", &["test", "--doc", "-p", "hardfault"], false)?;

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

/// The text after "test result:" in cargo's output, or a placeholder.
fn extract_test_summary(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.split_once("test result:"))
        .map_or_else(
            || "(summary not available)".to_string(),
            |(_, summary)| format!("({})", summary.trim()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_extracted_from_cargo_output() {
        let output = "running 3 tests\n\
                      test a ... ok\n\
                      test result: ok. 3 passed; 0 failed; 0 ignored\n";
        assert_eq!(
            extract_test_summary(output),
            "(ok. 3 passed; 0 failed; 0 ignored)"
        );
        assert_eq!(extract_test_summary(""), "(summary not available)");
    }
}

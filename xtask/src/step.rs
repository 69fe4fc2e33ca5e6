use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Whether a failing step aborts the run or only warns.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Advisory,
}

/// Run `cargo <args>`, printing a one-line result. Returns the output of a
/// successful run.
pub fn cargo(label: &str, args: &[&str], severity: Severity) -> Result<Option<Output>> {
    println!("{}", format!("  {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if output.status.success() {
        let summary = extract_test_summary(&String::from_utf8_lossy(&output.stdout))
            .map(|s| format!(" {s}"))
            .unwrap_or_default();
        println!(
            "{}",
            format!(
                "  ✓ {label} passed{summary} in {:.2}s",
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
        return Ok(Some(output));
    }

    match severity {
        Severity::Fatal => {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stdout));
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{label} failed");
        }
        Severity::Advisory => {
            eprintln!("{}", format!("  ⚠ {label} reported problems").yellow().bold());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            println!();
            Ok(None)
        }
    }
}

/// Pull "5 passed; 0 failed; ..." out of libtest output.
pub fn extract_test_summary(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.split("test result:").nth(1))
        .map(|summary| summary.trim().to_string())
}

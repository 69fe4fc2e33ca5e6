use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::step::{cargo, Severity};

const EMBEDDED_TARGET: &str = "thumbv7em-none-eabihf";

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking jack detection builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    // no_std: both library crates must build for the MCU with defmt logging.
    cargo(
        "Checking platform (no_std)",
        &["check", "-p", "platform", "--target", EMBEDDED_TARGET, "--features", "defmt"],
        Severity::Fatal,
    )?;
    cargo(
        "Checking jack-detect (no_std)",
        &["check", "-p", "jack-detect", "--target", EMBEDDED_TARGET, "--features", "defmt"],
        Severity::Fatal,
    )?;
    cargo(
        "Checking jack-detect (host, tracing + serde)",
        &["check", "-p", "jack-detect", "--features", "tracing,serde"],
        Severity::Fatal,
    )?;
    cargo(
        "Running clippy lints",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        Severity::Advisory,
    )?;
    if cargo("Checking code formatting", &["fmt", "--all", "--check"], Severity::Advisory)?
        .is_none()
    {
        eprintln!("     Run 'cargo fmt --all' to fix");
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

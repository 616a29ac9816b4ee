//! Command-line interface for the converter.

use std::path::PathBuf;

use clap::Parser;
use console::style;

use crate::config::{derive_output_path, filter_set, report_generator_location};
use crate::convert::{convert, ConvertOptions};
use crate::decode::DecodeOptions;
use crate::error::{FprError, Result};
use crate::report::ReportOptions;

/// Convert a Fortify FPR scan bundle to a SonarQube generic-issue report.
#[derive(Parser)]
#[command(name = "fpr-to-sonarqube")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the scan bundle (e.g. scan.fpr); the report is written next
    /// to it with a .json extension
    pub fpr: PathBuf,

    /// Location of the Fortify ReportGenerator executable
    /// (default: REPORT_GENERATOR environment variable)
    #[arg(long)]
    pub report_generator: Option<PathBuf>,

    /// Filter set to apply when generating the summary report
    /// (default: FILTER_SET environment variable)
    #[arg(long)]
    pub filter_set: Option<String>,

    /// Fail on unknown fields instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    convert_command(cli)
}

/// Execute the conversion.
fn convert_command(cli: Cli) -> Result<()> {
    // Resolve the generator location before touching the bundle; a missing
    // value must fail before any parsing starts.
    let generator = report_generator_location(cli.report_generator)?;

    if !cli.fpr.exists() {
        return Err(FprError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input bundle does not exist: {}", cli.fpr.display()),
        )));
    }

    let output = derive_output_path(&cli.fpr);
    let options = ConvertOptions {
        report: ReportOptions {
            generator,
            filter_set: filter_set(cli.filter_set),
        },
        decode: DecodeOptions {
            ignore_unknown: !cli.strict,
        },
    };

    println!(
        "{} {}",
        style("Converting").bold(),
        style(cli.fpr.display()).cyan()
    );

    let stats = convert(&cli.fpr, &output, &options)?;

    println!("  Issues: {}", style(stats.issues.emitted).green());
    if stats.issues.dropped() > 0 {
        println!(
            "  Dropped: {} (no severity: {}, no node: {}, no location: {})",
            style(stats.issues.dropped()).yellow().bold(),
            stats.issues.missing_severity,
            stats.issues.unresolved_node,
            stats.issues.missing_location
        );
    }
    println!("  Rules: {}", stats.rules);
    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output.display()
    );

    Ok(())
}

//! Run orchestration: summary generation, then the three streaming passes.
//!
//! Passes run strictly sequentially: the severity store is built before any
//! finding is resolved, and the node cache builds itself lazily inside the
//! issues pass on the first pool reference. Output is written incrementally;
//! a mid-run failure leaves a truncated file behind, by design. All
//! temporary resources are scoped guards released on every exit path.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tempfile::TempDir;
use tracing::info;

use crate::decode::{DecodeOptions, Decoder};
use crate::error::Result;
use crate::fpr::FprBundle;
use crate::issues::{self, IssueStats};
use crate::nodes::NodeResolutionCache;
use crate::report::{self, ReportOptions};
use crate::rules;
use crate::severity::SeverityStore;
use crate::sink::JsonSink;

/// Options for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Summary generation configuration.
    pub report: ReportOptions,

    /// Decode configuration shared by every pass.
    pub decode: DecodeOptions,
}

/// Counters from one completed run.
#[derive(Debug, Clone, Copy)]
pub struct ConvertStats {
    /// Severity entries indexed from the summary document.
    pub severity_entries: usize,

    /// Issue pass counters, including silent drops.
    pub issues: IssueStats,

    /// Rules written.
    pub rules: usize,
}

/// Convert a scan bundle into a normalized issue/rule report.
///
/// Generates the summary document through the external report generator,
/// then streams both documents into `output`.
///
/// # Arguments
/// * `input` - Path to the `.fpr` bundle
/// * `output` - Path of the JSON report to write
/// * `options` - Generator and decode configuration
pub fn convert(input: &Path, output: &Path, options: &ConvertOptions) -> Result<ConvertStats> {
    let work_dir = TempDir::with_prefix("fpr-convert-")?;
    let summary_path = report::generate_summary(input, &options.report, work_dir.path())?;
    convert_with_summary(input, &summary_path, output, options.decode)
}

/// Convert a scan bundle with an already-generated summary document.
///
/// # Arguments
/// * `input` - Path to the `.fpr` bundle
/// * `summary_path` - Path to the severity-grouped summary document
/// * `output` - Path of the JSON report to write
/// * `decode` - Decode configuration shared by every pass
pub fn convert_with_summary(
    input: &Path,
    summary_path: &Path,
    output: &Path,
    decode: DecodeOptions,
) -> Result<ConvertStats> {
    let bundle = FprBundle::open(input)?;
    let decoder = Decoder::new(decode);

    let summary_bytes = fs::metadata(summary_path)?.len();
    let mut severity = SeverityStore::for_summary_size(summary_bytes)?;
    severity.build(BufReader::new(File::open(summary_path)?), &decoder)?;

    let nodes = NodeResolutionCache::new(&bundle, &decoder);

    let mut sink = JsonSink::new(BufWriter::new(File::create(output)?));
    sink.begin_document()?;
    sink.begin_array("issues")?;
    let issue_stats = issues::write_issues(&bundle, &decoder, &severity, &nodes, &mut sink)?;
    sink.end_array()?;
    sink.begin_array("rules")?;
    let rule_count = rules::write_rules(&bundle, &decoder, &mut sink)?;
    sink.end_array()?;
    sink.end_document()?;

    let stats = ConvertStats {
        severity_entries: severity.len(),
        issues: issue_stats,
        rules: rule_count,
    };
    info!(
        issues = stats.issues.emitted,
        dropped = stats.issues.dropped(),
        rules = stats.rules,
        output = %output.display(),
        "conversion complete"
    );
    Ok(stats)
}

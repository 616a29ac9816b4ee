//! Summary-document generation through the external report generator.
//!
//! The bundled report template is written to the run's working directory and
//! the configured ReportGenerator executable is invoked against the scan
//! bundle, blocking until it exits. Parsing starts only after the process
//! has terminated; the generated document is never streamed. A non-zero
//! exit or a missing/empty output file aborts the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{FprError, Result};

/// Report template shipped with the converter, grouping all issues by
/// severity folder.
const REPORT_TEMPLATE: &str = include_str!("../assets/IssueReport.xml");

/// Configuration of one report-generator invocation.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Location of the external ReportGenerator executable.
    pub generator: PathBuf,

    /// Optional filter-set name narrowing the generated report.
    pub filter_set: Option<String>,
}

/// Generate the severity-grouped summary document for a scan bundle.
///
/// # Arguments
/// * `fpr` - Path to the scan bundle
/// * `options` - Generator location and optional filter set
/// * `work_dir` - Run-scoped directory receiving the template copy and the
///   generated document
///
/// # Returns
/// Path of the generated summary document inside `work_dir`.
pub fn generate_summary(fpr: &Path, options: &ReportOptions, work_dir: &Path) -> Result<PathBuf> {
    let template_path = work_dir.join("IssueReport.xml");
    fs::write(&template_path, REPORT_TEMPLATE)?;
    let output_path = work_dir.join("FortifyReport.xml");

    let mut command = Command::new(&options.generator);
    command
        .arg("-template")
        .arg(&template_path)
        .arg("-f")
        .arg(&output_path)
        .arg("-format")
        .arg("xml")
        .arg("-source")
        .arg(fpr);
    if let Some(filter_set) = &options.filter_set {
        command.arg("-filterSet").arg(filter_set);
    }

    info!(generator = %options.generator.display(), "generating issue summary");
    let status = command
        .status()
        .map_err(|source| FprError::ReportGeneratorSpawn {
            command: options.generator.clone(),
            source,
        })?;
    if !status.success() {
        return Err(FprError::ReportGeneratorFailed {
            command: options.generator.clone(),
            status: status.to_string(),
        });
    }

    match fs::metadata(&output_path) {
        Ok(metadata) if metadata.len() > 0 => {
            debug!(bytes = metadata.len(), path = %output_path.display(), "summary generated");
            Ok(output_path)
        }
        _ => Err(FprError::ReportOutputMissing { path: output_path }),
    }
}

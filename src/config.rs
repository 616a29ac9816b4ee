//! Configuration constants and resolution functions for the converter.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FprError, Result};

/// Engine id reported for every issue and rule.
pub const ENGINE_ID: &str = "Fortify";

/// Name of the findings-document entry inside the scan bundle.
pub const FVDL_ENTRY: &str = "audit.fvdl";

/// Dispatch path of the document-declared source base path in the findings
/// document.
pub const SOURCE_BASE_PATH: &str = "Build/SourceBasePath";

/// Dispatch path of one finding in the findings document.
pub const VULNERABILITY_PATH: &str = "Vulnerabilities/Vulnerability";

/// Dispatch path of one shared trace waypoint in the findings document.
pub const NODE_POOL_PATH: &str = "UnifiedNodePool/Node";

/// Dispatch path of one classification description in the findings document.
pub const DESCRIPTION_PATH: &str = "Description";

/// Dispatch path of one grouped issue in the summary document.
pub const GROUPED_ISSUE_PATH: &str =
    "ReportSection/SubSection/IssueListing/Chart/GroupingSection/Issue";

/// Summary documents larger than this are indexed through the disk-backed
/// severity store instead of an in-memory map.
///
/// The grouped summary grows with finding count; 32 MB of report XML
/// corresponds to several hundred thousand findings.
pub const SEVERITY_OVERFLOW_BYTES: u64 = 32 * 1024 * 1024;

/// Environment variable naming the report generator executable.
pub const REPORT_GENERATOR_ENV: &str = "REPORT_GENERATOR";

/// Environment variable naming an optional report filter set.
pub const FILTER_SET_ENV: &str = "FILTER_SET";

/// Resolve the report generator location from a CLI value or the environment.
///
/// Checked before any parsing starts; a missing value is fatal.
///
/// # Arguments
/// * `cli_value` - Value passed on the command line, if any
///
/// # Returns
/// * `Ok(path)` when configured
/// * `Err(FprError::MissingReportGenerator)` otherwise
pub fn report_generator_location(cli_value: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_value {
        return Ok(path);
    }
    match env::var_os(REPORT_GENERATOR_ENV) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(FprError::MissingReportGenerator),
    }
}

/// Resolve the optional filter-set name from a CLI value or the environment.
pub fn filter_set(cli_value: Option<String>) -> Option<String> {
    cli_value.or_else(|| env::var(FILTER_SET_ENV).ok().filter(|v| !v.is_empty()))
}

/// Derive the output path from the input bundle path.
///
/// Replaces the input extension with `json` (`scan.fpr` becomes `scan.json`).
///
/// # Examples
/// ```
/// use std::path::Path;
/// use fpr_to_sonarqube::config::derive_output_path;
///
/// let out = derive_output_path(Path::new("/tmp/scan.fpr"));
/// assert_eq!(out, Path::new("/tmp/scan.json"));
/// ```
#[must_use]
pub fn derive_output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

//! FPR to SonarQube converter.
//!
//! This crate converts a Fortify FPR scan bundle (detailed findings document
//! plus a derived severity-grouped summary) into a single normalized
//! issue/rule JSON report for SonarQube's generic-issue import. Both
//! documents are processed with streaming, memory-bounded passes; neither is
//! ever materialized in memory.
//!
//! # Example
//!
//! ```
//! use fpr_to_sonarqube::config;
//! use std::path::Path;
//!
//! // Output path derivation
//! assert_eq!(
//!     config::derive_output_path(Path::new("scan.fpr")),
//!     Path::new("scan.json").to_path_buf(),
//! );
//! ```
//!
//! # Architecture
//!
//! - [`xml`]: Path-dispatched pull parsing and bounded element trees
//! - [`decode`]: Explicit decode configuration and record decoding
//! - [`types`]: Core data types (findings, nodes, output records)
//! - [`error`]: Error types and Result alias
//! - [`fpr`]: Scan bundle access and findings-document extraction
//! - [`report`]: Summary generation via the external report generator
//! - [`severity`]: Severity store with in-memory and disk-backed backends
//! - [`nodes`]: Lazy node resolution cache
//! - [`issues`]: Issue assembly pass
//! - [`rules`]: Rule assembly pass
//! - [`sink`]: Incremental JSON output
//! - [`convert`]: Run orchestration
//! - [`cli`]: Command-line interface
//! - [`config`]: Constants and configuration resolution

pub mod cli;
pub mod config;
pub mod convert;
pub mod decode;
pub mod error;
pub mod fpr;
pub mod issues;
pub mod nodes;
pub mod report;
pub mod rules;
pub mod severity;
pub mod sink;
pub mod types;
pub mod xml;

// Re-export main functions
pub use convert::{convert, convert_with_summary, ConvertOptions, ConvertStats};

// Re-export commonly used items
pub use decode::{DecodeOptions, Decoder};
pub use error::{FprError, Result};
pub use types::{FindingRecord, NodeRecord, OutputIssue, OutputRule, Severity, SourceLocation};

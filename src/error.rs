//! Error types for the converter.
//!
//! Uses a single crate-wide error enum: `FprError` for library consumers
//! with detailed error context, plus a `Result` alias for internal use.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the converter library.
#[derive(Debug, Error)]
pub enum FprError {
    /// XML not well-formed, or a stream-level decode failure.
    #[error("XML parsing failed at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// Input ended while an element subtree was still open.
    #[error("Unexpected end of XML input at byte {position}")]
    UnexpectedEof { position: u64 },

    /// Malformed attribute syntax inside a start tag.
    #[error("Malformed XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Invalid escape sequence in attribute or text content.
    #[error("Invalid XML escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// Missing required XML attribute.
    #[error("Missing required XML attribute: {attribute} on <{element}>")]
    MissingAttribute { attribute: String, element: String },

    /// Unknown XML element encountered while decoding in strict mode.
    #[error("No field for element <{tag_name}>{}", .context.as_ref().map(|c| format!(" in {c}")).unwrap_or_default())]
    UnknownElement {
        tag_name: String,
        context: Option<String>,
    },

    /// Attribute value failed numeric conversion.
    #[error("Invalid numeric value '{value}' for attribute {attribute} on <{element}>")]
    InvalidNumber {
        attribute: String,
        element: String,
        value: String,
    },

    /// The input bundle could not be read as a zip archive.
    #[error("Failed to open scan bundle: {0}")]
    Bundle(#[from] zip::result::ZipError),

    /// The bundle is missing a required entry.
    #[error("Scan bundle {archive} has no '{entry}' entry")]
    MissingEntry { entry: String, archive: PathBuf },

    /// Report generator location not configured.
    #[error("Missing report generator location. Pass --report-generator or set REPORT_GENERATOR")]
    MissingReportGenerator,

    /// Report generator could not be started.
    #[error("Failed to start report generator {command}: {source}")]
    ReportGeneratorSpawn {
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report generator exited unsuccessfully.
    #[error("Report generator {command} failed with {status}")]
    ReportGeneratorFailed { command: PathBuf, status: String },

    /// Report generator terminated without producing a usable summary document.
    #[error("Report generator produced no usable output at {path}")]
    ReportOutputMissing { path: PathBuf },

    /// Disk-backed severity store failure.
    #[error("Severity store failed: {0}")]
    Store(#[from] heed::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, FprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_element_with_context() {
        let err = FprError::UnknownElement {
            tag_name: "foo".to_string(),
            context: Some("Vulnerability".to_string()),
        };
        assert_eq!(err.to_string(), "No field for element <foo> in Vulnerability");
    }

    #[test]
    fn test_unknown_element_without_context() {
        let err = FprError::UnknownElement {
            tag_name: "foo".to_string(),
            context: None,
        };
        assert_eq!(err.to_string(), "No field for element <foo>");
    }

    #[test]
    fn test_missing_entry_display() {
        let err = FprError::MissingEntry {
            entry: "audit.fvdl".to_string(),
            archive: PathBuf::from("/tmp/scan.fpr"),
        };
        assert!(err.to_string().contains("audit.fvdl"));
        assert!(err.to_string().contains("scan.fpr"));
    }

    #[test]
    fn test_invalid_number_display() {
        let err = FprError::InvalidNumber {
            attribute: "line".to_string(),
            element: "SourceLocation".to_string(),
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("'abc'"));
        assert!(err.to_string().contains("SourceLocation"));
    }
}

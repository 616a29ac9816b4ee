//! Core data types for the converter.
//!
//! Input-side records mirror the findings and summary documents; output-side
//! records serialize directly into the SonarQube generic-issue format.

use serde::Serialize;

use crate::config::ENGINE_ID;

/// A source location carried by a trace waypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File path relative to the document-declared base path.
    pub path: String,

    /// Start line (1-based).
    pub line: u32,

    /// End line, when the scanner recorded one.
    pub line_end: Option<u32>,

    /// Start column (1-based).
    pub col_start: u32,

    /// End column, when the scanner recorded one.
    pub col_end: Option<u32>,
}

/// One trace waypoint: id plus optional source location.
///
/// Pool nodes always carry an id; nodes embedded inline in a trace entry may
/// not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Waypoint id, used as the node-pool key.
    pub id: String,

    /// Resolved source location, if the waypoint has one.
    pub location: Option<SourceLocation>,
}

/// One entry of a finding's primary trace.
///
/// Either embeds a node inline or references a pool node by id. Both may be
/// absent for entries this converter does not consume.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceEntry {
    /// Inline waypoint, if embedded.
    pub node: Option<NodeRecord>,

    /// Pool reference, if the waypoint is shared.
    pub node_ref: Option<String>,
}

/// One finding decoded from the findings document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingRecord {
    /// Classification id (maps to the output rule id).
    pub class_id: String,

    /// Classification type (e.g. "SQL Injection").
    pub kind: String,

    /// Classification subtype; empty when the scanner recorded none.
    pub subtype: String,

    /// Stable instance id shared with the summary document.
    pub instance_id: String,

    /// Ordered primary trace entries.
    pub trace: Vec<TraceEntry>,
}

impl FindingRecord {
    /// Build the issue message: the classification type, with the subtype
    /// appended after `": "` only when non-empty.
    #[must_use]
    pub fn message(&self) -> String {
        if self.subtype.is_empty() {
            self.kind.clone()
        } else {
            format!("{}: {}", self.kind, self.subtype)
        }
    }
}

/// One grouped entry decoded from the summary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityEntry {
    /// Instance id shared with the findings document.
    pub instance_id: String,

    /// Free-text severity bucket label; case varies across scanner versions.
    pub bucket: String,
}

/// One classification description decoded from the findings document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRecord {
    /// Classification id.
    pub class_id: String,

    /// Explanation text, as written by the scanner.
    pub explanation: String,
}

/// SonarQube issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    /// Map a summary-document bucket label to an output severity.
    ///
    /// Matching is case-insensitive; unrecognized or empty labels map to
    /// `Info`.
    ///
    /// # Examples
    /// ```
    /// use fpr_to_sonarqube::types::Severity;
    ///
    /// assert_eq!(Severity::from_bucket("Critical"), Severity::Critical);
    /// assert_eq!(Severity::from_bucket("HIGH"), Severity::Major);
    /// assert_eq!(Severity::from_bucket("somewhere else"), Severity::Info);
    /// ```
    #[must_use]
    pub fn from_bucket(label: &str) -> Self {
        if label.eq_ignore_ascii_case("critical") {
            Self::Critical
        } else if label.eq_ignore_ascii_case("high") {
            Self::Major
        } else if label.eq_ignore_ascii_case("medium") {
            Self::Minor
        } else {
            Self::Info
        }
    }

    /// Get the string value used in the output document.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocker => "BLOCKER",
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Info => "INFO",
        }
    }
}

/// Text range of an issue's primary location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_line: u32,

    pub start_column: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

impl TextRange {
    /// Build a text range from a source location.
    ///
    /// Start line and column are always set. The end line is included only if
    /// recorded and strictly greater than the start line; the end column only
    /// if recorded and strictly greater than the start column. The two ends
    /// are judged independently, so a range never comes out zero-width or
    /// inverted.
    #[must_use]
    pub fn from_location(location: &SourceLocation) -> Self {
        Self {
            start_line: location.line,
            start_column: location.col_start,
            end_line: location.line_end.filter(|end| *end > location.line),
            end_column: location.col_end.filter(|end| *end > location.col_start),
        }
    }
}

/// Primary location of an output issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLocation {
    pub file_path: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_range: Option<TextRange>,
}

/// One normalized issue record written to the output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputIssue {
    pub engine_id: &'static str,

    pub rule_id: String,

    #[serde(rename = "type")]
    pub kind: &'static str,

    pub severity: Severity,

    pub primary_location: IssueLocation,
}

impl OutputIssue {
    /// Create an issue with the fixed engine id and type.
    #[must_use]
    pub fn new(rule_id: String, severity: Severity, primary_location: IssueLocation) -> Self {
        Self {
            engine_id: ENGINE_ID,
            rule_id,
            kind: "VULNERABILITY",
            severity,
            primary_location,
        }
    }
}

/// One normalized rule record written to the output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRule {
    pub engine_id: &'static str,

    pub rule_id: String,

    pub name: String,

    pub description: String,

    pub severity: Severity,

    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl OutputRule {
    /// Create a rule from a classification description.
    ///
    /// Every classification maps to a single blocking severity; the nuanced
    /// per-instance severity is already consumed by issue assembly. The
    /// description has the literal `<Content>` and `</Content>` substrings
    /// removed; any other embedded markup passes through unchanged.
    #[must_use]
    pub fn from_description(description: &DescriptionRecord) -> Self {
        Self {
            engine_id: ENGINE_ID,
            rule_id: description.class_id.clone(),
            name: description.class_id.clone(),
            description: description
                .explanation
                .replace("<Content>", "")
                .replace("</Content>", ""),
            severity: Severity::Blocker,
            kind: "VULNERABILITY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(line: u32, col_start: u32, line_end: Option<u32>, col_end: Option<u32>) -> SourceLocation {
        SourceLocation {
            path: "a.java".to_string(),
            line,
            line_end,
            col_start,
            col_end,
        }
    }

    #[test]
    fn test_severity_from_bucket_case_insensitive() {
        assert_eq!(Severity::from_bucket("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::from_bucket("critical"), Severity::Critical);
        assert_eq!(Severity::from_bucket("CriticAL"), Severity::Critical);
        assert_eq!(Severity::from_bucket("High"), Severity::Major);
        assert_eq!(Severity::from_bucket("medium"), Severity::Minor);
    }

    #[test]
    fn test_severity_from_bucket_fallback() {
        assert_eq!(Severity::from_bucket("Low"), Severity::Info);
        assert_eq!(Severity::from_bucket(""), Severity::Info);
        assert_eq!(Severity::from_bucket("Best Practice"), Severity::Info);
    }

    #[test]
    fn test_text_range_end_line_not_greater() {
        // Same line, wider column: endLine absent, endColumn present.
        let range = TextRange::from_location(&location(10, 2, Some(10), Some(5)));
        assert_eq!(range.start_line, 10);
        assert_eq!(range.start_column, 2);
        assert_eq!(range.end_line, None);
        assert_eq!(range.end_column, Some(5));
    }

    #[test]
    fn test_text_range_end_column_not_greater() {
        // Later line, earlier column: endLine present, endColumn absent.
        let range = TextRange::from_location(&location(10, 2, Some(12), Some(1)));
        assert_eq!(range.end_line, Some(12));
        assert_eq!(range.end_column, None);
    }

    #[test]
    fn test_text_range_missing_ends() {
        let range = TextRange::from_location(&location(5, 1, None, None));
        assert_eq!(range.end_line, None);
        assert_eq!(range.end_column, None);
    }

    #[test]
    fn test_message_without_subtype() {
        let finding = FindingRecord {
            class_id: "C1".to_string(),
            kind: "SQL Injection".to_string(),
            subtype: String::new(),
            instance_id: "I1".to_string(),
            trace: Vec::new(),
        };
        assert_eq!(finding.message(), "SQL Injection");
    }

    #[test]
    fn test_message_with_subtype() {
        let finding = FindingRecord {
            class_id: "C1".to_string(),
            kind: "Path Manipulation".to_string(),
            subtype: "Zip Entry Overwrite".to_string(),
            instance_id: "I1".to_string(),
            trace: Vec::new(),
        };
        assert_eq!(finding.message(), "Path Manipulation: Zip Entry Overwrite");
    }

    #[test]
    fn test_output_issue_serialization_shape() {
        let issue = OutputIssue::new(
            "C1".to_string(),
            Severity::Major,
            IssueLocation {
                file_path: "/src/a.java".to_string(),
                message: "SQL Injection".to_string(),
                text_range: Some(TextRange::from_location(&location(5, 1, None, None))),
            },
        );

        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["engineId"], "Fortify");
        assert_eq!(value["ruleId"], "C1");
        assert_eq!(value["type"], "VULNERABILITY");
        assert_eq!(value["severity"], "MAJOR");
        assert_eq!(value["primaryLocation"]["filePath"], "/src/a.java");
        assert_eq!(value["primaryLocation"]["textRange"]["startLine"], 5);
        assert_eq!(value["primaryLocation"]["textRange"]["startColumn"], 1);
        assert!(value["primaryLocation"]["textRange"]
            .as_object()
            .unwrap()
            .get("endLine")
            .is_none());
    }

    #[test]
    fn test_output_rule_strips_content_markers() {
        let rule = OutputRule::from_description(&DescriptionRecord {
            class_id: "C1".to_string(),
            explanation: "<Content>Do X</Content>".to_string(),
        });
        assert_eq!(rule.description, "Do X");
        assert_eq!(rule.name, "C1");
        assert_eq!(rule.rule_id, "C1");
        assert_eq!(rule.severity, Severity::Blocker);
    }

    #[test]
    fn test_output_rule_strip_is_case_sensitive() {
        let rule = OutputRule::from_description(&DescriptionRecord {
            class_id: "C1".to_string(),
            explanation: "<content>Do X</content>".to_string(),
        });
        assert_eq!(rule.description, "<content>Do X</content>");
    }

    #[test]
    fn test_output_rule_other_markup_passes_through() {
        let rule = OutputRule::from_description(&DescriptionRecord {
            class_id: "C1".to_string(),
            explanation: "<Content><b>Do X</b></Content>".to_string(),
        });
        assert_eq!(rule.description, "<b>Do X</b>");
    }
}

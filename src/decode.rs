//! Record decoding from bounded element trees.
//!
//! One [`Decoder`] is constructed per run from immutable [`DecodeOptions`]
//! and passed to every component that decodes records, so the
//! unknown-field policy is explicit configuration rather than process-wide
//! state.

use crate::error::{FprError, Result};
use crate::types::{
    DescriptionRecord, FindingRecord, NodeRecord, SeverityEntry, SourceLocation, TraceEntry,
};
use crate::xml::XmlElement;

/// Immutable decode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Skip element children the decoder has no field for. When `false`,
    /// an unknown child aborts the run with `FprError::UnknownElement`.
    /// Enforced on every record decoder: findings, grouped issues, and
    /// descriptions.
    pub ignore_unknown: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            ignore_unknown: true,
        }
    }
}

/// Decodes element trees into typed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// Create a decoder with the given options.
    #[must_use]
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Decode one `<Vulnerability>` element into a finding record.
    ///
    /// Shape:
    /// `ClassInfo/{ClassID,Type,Subtype}`, `InstanceInfo/InstanceID`, and the
    /// primary trace entries under `AnalysisInfo/Unified/Trace/Primary`.
    pub fn finding(&self, element: &XmlElement) -> Result<FindingRecord> {
        self.check_known(
            element,
            &["ClassInfo", "InstanceInfo", "AnalysisInfo"],
        )?;

        let class_info = require_child(element, "ClassInfo")?;
        let instance_info = require_child(element, "InstanceInfo")?;

        let trace = element
            .find_by_path("AnalysisInfo/Unified/Trace/Primary")
            .map(|primary| {
                primary
                    .find_children("Entry")
                    .map(|entry| self.trace_entry(entry))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(FindingRecord {
            class_id: require_text(class_info, "ClassID")?,
            kind: require_text(class_info, "Type")?,
            subtype: optional_text(class_info, "Subtype"),
            instance_id: require_text(instance_info, "InstanceID")?,
            trace,
        })
    }

    /// Decode one trace `<Entry>` element.
    fn trace_entry(&self, element: &XmlElement) -> Result<TraceEntry> {
        let node = element
            .find_child("Node")
            .map(|node| self.node(node))
            .transpose()?;
        let node_ref = element
            .find_child("NodeRef")
            .map(|node_ref| require_attribute(node_ref, "id"))
            .transpose()?;
        Ok(TraceEntry { node, node_ref })
    }

    /// Decode one `<Node>` element, inline or from the shared pool.
    ///
    /// Pool nodes carry an `id` attribute; inline nodes may not, in which
    /// case the id is empty.
    pub fn node(&self, element: &XmlElement) -> Result<NodeRecord> {
        let location = element
            .find_child("SourceLocation")
            .map(|location| self.source_location(location))
            .transpose()?;
        Ok(NodeRecord {
            id: element.attribute("id").unwrap_or_default().to_string(),
            location,
        })
    }

    /// Decode one `<SourceLocation>` element.
    fn source_location(&self, element: &XmlElement) -> Result<SourceLocation> {
        Ok(SourceLocation {
            path: require_attribute(element, "path")?,
            line: require_number(element, "line")?,
            line_end: optional_number(element, "lineEnd")?,
            col_start: require_number(element, "colStart")?,
            col_end: optional_number(element, "colEnd")?,
        })
    }

    /// Decode one grouped `<Issue>` element from the summary document into a
    /// severity entry.
    ///
    /// The instance id is the `iid` attribute; the bucket label is the
    /// `<Folder>` child's text.
    pub fn severity_entry(&self, element: &XmlElement) -> Result<SeverityEntry> {
        self.check_known(element, &["Folder", "Category"])?;
        Ok(SeverityEntry {
            instance_id: require_attribute(element, "iid")?,
            bucket: optional_text(element, "Folder"),
        })
    }

    /// Decode one `<Description>` element into a classification description.
    pub fn description(&self, element: &XmlElement) -> Result<DescriptionRecord> {
        self.check_known(element, &["Abstract", "Explanation"])?;
        Ok(DescriptionRecord {
            class_id: require_attribute(element, "classID")?,
            explanation: optional_text(element, "Explanation"),
        })
    }

    /// Enforce the unknown-field policy on an element's children.
    fn check_known(&self, element: &XmlElement, known: &[&str]) -> Result<()> {
        if self.options.ignore_unknown {
            return Ok(());
        }
        for child in &element.children {
            if !known.contains(&child.name.as_str()) {
                return Err(FprError::UnknownElement {
                    tag_name: child.name.clone(),
                    context: Some(element.name.clone()),
                });
            }
        }
        Ok(())
    }
}

fn require_child<'a>(element: &'a XmlElement, tag: &str) -> Result<&'a XmlElement> {
    element.find_child(tag).ok_or_else(|| FprError::MissingElement {
        element: tag.to_string(),
        context: element.name.clone(),
    })
}

fn require_text(element: &XmlElement, tag: &str) -> Result<String> {
    Ok(require_child(element, tag)?.trimmed_text().to_string())
}

fn optional_text(element: &XmlElement, tag: &str) -> String {
    element
        .find_child(tag)
        .map(|child| child.trimmed_text().to_string())
        .unwrap_or_default()
}

fn require_attribute(element: &XmlElement, name: &str) -> Result<String> {
    element
        .attribute(name)
        .map(str::to_string)
        .ok_or_else(|| FprError::MissingAttribute {
            attribute: name.to_string(),
            element: element.name.clone(),
        })
}

fn require_number(element: &XmlElement, name: &str) -> Result<u32> {
    let value = require_attribute(element, name)?;
    parse_number(element, name, &value)
}

fn optional_number(element: &XmlElement, name: &str) -> Result<Option<u32>> {
    element
        .attribute(name)
        .map(|value| parse_number(element, name, value))
        .transpose()
}

fn parse_number(element: &XmlElement, name: &str, value: &str) -> Result<u32> {
    value.parse().map_err(|_| FprError::InvalidNumber {
        attribute: name.to_string(),
        element: element.name.clone(),
        value: value.to_string(),
    })
}

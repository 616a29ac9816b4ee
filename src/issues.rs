//! Issue assembly: one pass over the findings document.
//!
//! Two handlers run in the same pass: one captures the document-declared
//! source base path, the other decodes each finding, resolves its severity
//! and first trace waypoint, and writes one normalized issue straight to the
//! sink. Findings that cannot be resolved are dropped without error; the
//! drop reasons are counted and logged, never surfaced.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::{SOURCE_BASE_PATH, VULNERABILITY_PATH};
use crate::decode::Decoder;
use crate::error::Result;
use crate::fpr::FprBundle;
use crate::nodes::NodeResolutionCache;
use crate::severity::SeverityStore;
use crate::sink::JsonSink;
use crate::types::{FindingRecord, IssueLocation, OutputIssue, Severity, TextRange};
use crate::xml::PathDispatchParser;

/// Counters for one issues pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueStats {
    /// Issues written to the sink.
    pub emitted: usize,

    /// Findings dropped because the summary had no entry for their
    /// instance id.
    pub missing_severity: usize,

    /// Findings dropped because no trace waypoint could be resolved.
    pub unresolved_node: usize,

    /// Findings dropped because the resolved waypoint has no source
    /// location.
    pub missing_location: usize,
}

impl IssueStats {
    /// Total findings dropped across all reasons.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.missing_severity + self.unresolved_node + self.missing_location
    }
}

/// Outcome of resolving one finding.
enum Resolution {
    Issue(OutputIssue),
    MissingSeverity,
    UnresolvedNode,
    MissingLocation,
}

/// Stream all findings through resolution into the sink's open array.
///
/// # Arguments
/// * `bundle` - Opened scan bundle
/// * `decoder` - Shared decode configuration
/// * `severity` - Severity store, already built
/// * `nodes` - Node cache; built lazily on the first pool reference
/// * `sink` - Output sink with the issues array open
pub fn write_issues<W: Write>(
    bundle: &FprBundle,
    decoder: &Decoder,
    severity: &SeverityStore,
    nodes: &NodeResolutionCache<'_>,
    sink: &mut JsonSink<W>,
) -> Result<IssueStats> {
    let base_path: RefCell<Option<String>> = RefCell::new(None);
    let mut stats = IssueStats::default();

    {
        let base_capture = &base_path;
        let base_read = &base_path;
        let stats = &mut stats;
        let mut parser = PathDispatchParser::new()
            .register(SOURCE_BASE_PATH, move |cursor| {
                *base_capture.borrow_mut() = Some(cursor.read_text()?.trim().to_string());
                Ok(())
            })
            .register(VULNERABILITY_PATH, move |cursor| {
                let finding = decoder.finding(&cursor.read_tree()?)?;
                let base = base_read.borrow();
                match resolve(&finding, base.as_deref(), severity, nodes)? {
                    Resolution::Issue(issue) => {
                        sink.write_record(&issue)?;
                        stats.emitted += 1;
                    }
                    Resolution::MissingSeverity => {
                        debug!(iid = %finding.instance_id, "dropped: no severity entry");
                        stats.missing_severity += 1;
                    }
                    Resolution::UnresolvedNode => {
                        debug!(iid = %finding.instance_id, "dropped: no resolvable node");
                        stats.unresolved_node += 1;
                    }
                    Resolution::MissingLocation => {
                        debug!(iid = %finding.instance_id, "dropped: node has no location");
                        stats.missing_location += 1;
                    }
                }
                Ok(())
            });
        parser.run(bundle.findings_reader()?)?;
    }

    debug!(
        emitted = stats.emitted,
        dropped = stats.dropped(),
        "issues pass complete"
    );
    Ok(stats)
}

/// Resolve one finding into an output issue, or the reason it is dropped.
fn resolve(
    finding: &FindingRecord,
    base_path: Option<&str>,
    severity: &SeverityStore,
    nodes: &NodeResolutionCache<'_>,
) -> Result<Resolution> {
    let Some(bucket) = severity.lookup(&finding.instance_id)? else {
        return Ok(Resolution::MissingSeverity);
    };

    let Some(entry) = finding.trace.first() else {
        return Ok(Resolution::UnresolvedNode);
    };
    // Prefer the inline node; only a reference consults the pool, which
    // builds the cache on first use.
    let node = match (&entry.node, &entry.node_ref) {
        (Some(node), _) => Some(node.clone()),
        (None, Some(id)) => nodes.lookup(id)?,
        (None, None) => None,
    };
    let Some(node) = node else {
        return Ok(Resolution::UnresolvedNode);
    };
    let Some(location) = node.location else {
        return Ok(Resolution::MissingLocation);
    };

    // Resolve against the document-declared base path, never the process
    // working directory.
    let file_path = Path::new(base_path.unwrap_or_default())
        .join(&location.path)
        .to_string_lossy()
        .into_owned();

    Ok(Resolution::Issue(OutputIssue::new(
        finding.class_id.clone(),
        Severity::from_bucket(&bucket),
        IssueLocation {
            file_path,
            message: finding.message(),
            text_range: Some(TextRange::from_location(&location)),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Cursor;
    use zip::write::SimpleFileOptions;

    use crate::config::FVDL_ENTRY;

    fn bundle_with_fvdl(dir: &Path, fvdl: &str) -> FprBundle {
        let path = dir.join("scan.fpr");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file(FVDL_ENTRY, SimpleFileOptions::default()).unwrap();
        std::io::Write::write_all(&mut writer, fvdl.as_bytes()).unwrap();
        writer.finish().unwrap();
        FprBundle::open(&path).unwrap()
    }

    fn store_with(entries: &[(&str, &str)]) -> SeverityStore {
        let mut xml = String::from(
            "<ReportDefinition><ReportSection><SubSection><IssueListing><Chart><GroupingSection>",
        );
        for (iid, folder) in entries {
            xml.push_str(&format!(
                r#"<Issue iid="{iid}"><Folder>{folder}</Folder></Issue>"#
            ));
        }
        xml.push_str(
            "</GroupingSection></Chart></IssueListing></SubSection></ReportSection></ReportDefinition>",
        );
        let mut store = SeverityStore::in_memory();
        store
            .build(Cursor::new(xml.into_bytes()), &Decoder::default())
            .unwrap();
        store
    }

    fn vulnerability(iid: &str, class_id: &str, entry_xml: &str) -> String {
        format!(
            r#"<Vulnerability>
                <ClassInfo><ClassID>{class_id}</ClassID><Type>SQL Injection</Type></ClassInfo>
                <InstanceInfo><InstanceID>{iid}</InstanceID></InstanceInfo>
                <AnalysisInfo><Unified><Trace><Primary>{entry_xml}</Primary></Trace></Unified></AnalysisInfo>
            </Vulnerability>"#
        )
    }

    const INLINE_ENTRY: &str = r#"<Entry><Node><SourceLocation path="a.java" line="5" colStart="1"/></Node></Entry>"#;

    fn run_pass(fvdl: &str, store: &SeverityStore) -> (Vec<serde_json::Value>, IssueStats, bool) {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with_fvdl(dir.path(), fvdl);
        let decoder = Decoder::default();
        let nodes = NodeResolutionCache::new(&bundle, &decoder);

        let mut out = Vec::new();
        let mut sink = JsonSink::new(&mut out);
        sink.begin_document().unwrap();
        sink.begin_array("issues").unwrap();
        let stats = write_issues(&bundle, &decoder, store, &nodes, &mut sink).unwrap();
        sink.end_array().unwrap();
        sink.end_document().unwrap();

        let built = nodes.is_built();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        (value["issues"].as_array().unwrap().clone(), stats, built)
    }

    #[test]
    fn test_issues_emitted_in_document_order() {
        let fvdl = format!(
            "<FVDL><Build><SourceBasePath>/src</SourceBasePath></Build><Vulnerabilities>{}{}{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", INLINE_ENTRY),
            vulnerability("I2", "C2", INLINE_ENTRY),
            vulnerability("I3", "C3", INLINE_ENTRY),
        );
        let store = store_with(&[("I1", "High"), ("I2", "High"), ("I3", "Medium")]);
        let (issues, stats, _) = run_pass(&fvdl, &store);

        assert_eq!(stats.emitted, 3);
        let rule_ids: Vec<_> = issues.iter().map(|i| i["ruleId"].as_str().unwrap()).collect();
        assert_eq!(rule_ids, vec!["C1", "C2", "C3"]);
    }

    #[test]
    fn test_missing_severity_drops_silently() {
        let fvdl = format!(
            "<FVDL><Vulnerabilities>{}{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", INLINE_ENTRY),
            vulnerability("I2", "C2", INLINE_ENTRY),
        );
        let store = store_with(&[("I2", "High")]);
        let (issues, stats, _) = run_pass(&fvdl, &store);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0]["ruleId"], "C2");
        assert_eq!(stats.missing_severity, 1);
    }

    #[test]
    fn test_node_ref_resolved_from_pool() {
        let fvdl = format!(
            r#"<FVDL><Build><SourceBasePath>/src</SourceBasePath></Build>
            <Vulnerabilities>{}</Vulnerabilities>
            <UnifiedNodePool><Node id="7"><SourceLocation path="pool.java" line="3" colStart="2"/></Node></UnifiedNodePool>
            </FVDL>"#,
            vulnerability("I1", "C1", r#"<Entry><NodeRef id="7"/></Entry>"#),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, stats, built) = run_pass(&fvdl, &store);

        assert_eq!(stats.emitted, 1);
        assert!(built);
        assert_eq!(issues[0]["primaryLocation"]["filePath"], "/src/pool.java");
    }

    #[test]
    fn test_unknown_node_ref_drops_silently() {
        let fvdl = format!(
            r#"<FVDL><Vulnerabilities>{}</Vulnerabilities>
            <UnifiedNodePool><Node id="1"><SourceLocation path="a.java" line="1" colStart="1"/></Node></UnifiedNodePool>
            </FVDL>"#,
            vulnerability("I1", "C1", r#"<Entry><NodeRef id="99"/></Entry>"#),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, stats, _) = run_pass(&fvdl, &store);

        assert!(issues.is_empty());
        assert_eq!(stats.unresolved_node, 1);
    }

    #[test]
    fn test_missing_location_drops_silently() {
        let fvdl = format!(
            "<FVDL><Vulnerabilities>{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", "<Entry><Node/></Entry>"),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, stats, _) = run_pass(&fvdl, &store);

        assert!(issues.is_empty());
        assert_eq!(stats.missing_location, 1);
    }

    #[test]
    fn test_inline_node_never_builds_pool_cache() {
        // The pool here is semantically corrupt (unparsable line number);
        // inline resolution must succeed without ever touching it.
        let fvdl = format!(
            r#"<FVDL><Vulnerabilities>{}</Vulnerabilities>
            <UnifiedNodePool><Node id="1"><SourceLocation path="a.java" line="garbage" colStart="1"/></Node></UnifiedNodePool>
            </FVDL>"#,
            vulnerability("I1", "C1", INLINE_ENTRY),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, stats, built) = run_pass(&fvdl, &store);

        assert_eq!(stats.emitted, 1);
        assert_eq!(issues.len(), 1);
        assert!(!built);
    }

    #[test]
    fn test_empty_trace_drops_silently() {
        let fvdl = format!(
            "<FVDL><Vulnerabilities>{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", ""),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, stats, _) = run_pass(&fvdl, &store);

        assert!(issues.is_empty());
        assert_eq!(stats.unresolved_node, 1);
    }

    #[test]
    fn test_base_path_missing_keeps_relative_path() {
        let fvdl = format!(
            "<FVDL><Vulnerabilities>{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", INLINE_ENTRY),
        );
        let store = store_with(&[("I1", "High")]);
        let (issues, _, _) = run_pass(&fvdl, &store);
        assert_eq!(issues[0]["primaryLocation"]["filePath"], "a.java");
    }

    #[test]
    fn test_severity_mapped_from_bucket() {
        let fvdl = format!(
            "<FVDL><Vulnerabilities>{}{}{}</Vulnerabilities></FVDL>",
            vulnerability("I1", "C1", INLINE_ENTRY),
            vulnerability("I2", "C2", INLINE_ENTRY),
            vulnerability("I3", "C3", INLINE_ENTRY),
        );
        let store = store_with(&[("I1", "critical"), ("I2", "HIGH"), ("I3", "Unexpected")]);
        let (issues, _, _) = run_pass(&fvdl, &store);

        assert_eq!(issues[0]["severity"], "CRITICAL");
        assert_eq!(issues[1]["severity"], "MAJOR");
        assert_eq!(issues[2]["severity"], "INFO");
    }

    #[test]
    fn test_stats_dropped_total() {
        let stats = IssueStats {
            emitted: 5,
            missing_severity: 1,
            unresolved_node: 2,
            missing_location: 3,
        };
        assert_eq!(stats.dropped(), 6);
    }
}

//! Rule assembly: one pass over the classification descriptions.
//!
//! Every description becomes one rule record with a fixed blocking severity;
//! the scanner's nuanced severity is per-instance and already consumed by
//! issue assembly.

use std::io::Write;

use tracing::debug;

use crate::config::DESCRIPTION_PATH;
use crate::decode::Decoder;
use crate::error::Result;
use crate::fpr::FprBundle;
use crate::sink::JsonSink;
use crate::types::OutputRule;
use crate::xml::PathDispatchParser;

/// Stream all classification descriptions as rules into the sink's open
/// array.
///
/// # Arguments
/// * `bundle` - Opened scan bundle
/// * `decoder` - Shared decode configuration
/// * `sink` - Output sink with the rules array open
///
/// # Returns
/// The number of rules written.
pub fn write_rules<W: Write>(
    bundle: &FprBundle,
    decoder: &Decoder,
    sink: &mut JsonSink<W>,
) -> Result<usize> {
    let mut written = 0usize;
    {
        let written = &mut written;
        let mut parser = PathDispatchParser::new().register(DESCRIPTION_PATH, move |cursor| {
            let description = decoder.description(&cursor.read_tree()?)?;
            sink.write_record(&OutputRule::from_description(&description))?;
            *written += 1;
            Ok(())
        });
        parser.run(bundle.findings_reader()?)?;
    }
    debug!(rules = written, "rules pass complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::{Path, PathBuf};
    use zip::write::SimpleFileOptions;

    use crate::config::FVDL_ENTRY;

    fn bundle_with_fvdl(dir: &Path, fvdl: &str) -> FprBundle {
        let path: PathBuf = dir.join("scan.fpr");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file(FVDL_ENTRY, SimpleFileOptions::default()).unwrap();
        std::io::Write::write_all(&mut writer, fvdl.as_bytes()).unwrap();
        writer.finish().unwrap();
        FprBundle::open(&path).unwrap()
    }

    fn run_pass(fvdl: &str) -> (Vec<serde_json::Value>, usize) {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with_fvdl(dir.path(), fvdl);
        let decoder = Decoder::default();

        let mut out = Vec::new();
        let mut sink = JsonSink::new(&mut out);
        sink.begin_document().unwrap();
        sink.begin_array("rules").unwrap();
        let written = write_rules(&bundle, &decoder, &mut sink).unwrap();
        sink.end_array().unwrap();
        sink.end_document().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        (value["rules"].as_array().unwrap().clone(), written)
    }

    #[test]
    fn test_one_rule_per_description() {
        let fvdl = r#"<FVDL>
            <Description classID="C1"><Explanation>&lt;Content&gt;Do X&lt;/Content&gt;</Explanation></Description>
            <Description classID="C2"><Explanation>Plain</Explanation></Description>
        </FVDL>"#;
        let (rules, written) = run_pass(fvdl);

        assert_eq!(written, 2);
        assert_eq!(rules[0]["ruleId"], "C1");
        assert_eq!(rules[0]["name"], "C1");
        assert_eq!(rules[0]["description"], "Do X");
        assert_eq!(rules[0]["severity"], "BLOCKER");
        assert_eq!(rules[0]["type"], "VULNERABILITY");
        assert_eq!(rules[0]["engineId"], "Fortify");
        assert_eq!(rules[1]["description"], "Plain");
    }

    #[test]
    fn test_lowercase_content_markers_pass_through() {
        let fvdl = r#"<FVDL>
            <Description classID="C1"><Explanation>&lt;content&gt;Do X&lt;/content&gt;</Explanation></Description>
        </FVDL>"#;
        let (rules, _) = run_pass(fvdl);
        assert_eq!(rules[0]["description"], "<content>Do X</content>");
    }

    #[test]
    fn test_no_descriptions_writes_nothing() {
        let (rules, written) = run_pass("<FVDL><Build/></FVDL>");
        assert!(rules.is_empty());
        assert_eq!(written, 0);
    }
}

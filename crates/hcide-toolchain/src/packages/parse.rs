//! Normalise the three list-command output formats into [`PackageRecord`]s.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolchainError};
use crate::profile::ListFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    pub installed: bool,
}

impl PackageRecord {
    fn installed(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            latest_version: None,
            installed: true,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.installed
            && self
                .latest_version
                .as_deref()
                .is_some_and(|latest| !latest.is_empty() && latest != self.version)
    }
}

/// Parse list output. Single-document formats return an empty list when the
/// document is malformed; the line-delimited format skips bad objects.
pub fn parse_package_list(format: ListFormat, output: &str) -> Vec<PackageRecord> {
    let parsed = match format {
        ListFormat::JsonArray => parse_json_array(output),
        ListFormat::DependencyMap => parse_dependency_map(output),
        ListFormat::JsonLines => Ok(parse_json_lines(output)),
    };
    match parsed {
        Ok(records) => dedup_by_name(records),
        Err(e) => {
            tracing::warn!("{}", e);
            Vec::new()
        }
    }
}

#[derive(Deserialize)]
struct ArrayEntry {
    name: String,
    #[serde(default)]
    version: String,
}

fn parse_json_array(output: &str) -> Result<Vec<PackageRecord>> {
    let entries: Vec<ArrayEntry> =
        serde_json::from_str(output).map_err(|e| ToolchainError::Parse(e.to_string()))?;
    Ok(entries
        .into_iter()
        .map(|e| PackageRecord::installed(e.name, e.version))
        .collect())
}

#[derive(Deserialize)]
struct DependencyDocument {
    #[serde(default)]
    dependencies: BTreeMap<String, DependencyEntry>,
}

#[derive(Deserialize)]
struct DependencyEntry {
    #[serde(default)]
    version: Option<String>,
}

fn parse_dependency_map(output: &str) -> Result<Vec<PackageRecord>> {
    let doc: DependencyDocument =
        serde_json::from_str(output).map_err(|e| ToolchainError::Parse(e.to_string()))?;
    Ok(doc
        .dependencies
        .into_iter()
        .map(|(name, dep)| PackageRecord::installed(name, dep.version.unwrap_or_default()))
        .collect())
}

#[derive(Deserialize)]
struct ModuleEntry {
    #[serde(rename = "Path")]
    path: Option<String>,
    #[serde(rename = "Version")]
    version: Option<String>,
}

/// Concatenated JSON objects, one per module, possibly pretty-printed over
/// several lines. An object must end its line; a malformed object, or one
/// followed by anything but whitespace on the same line, is dropped and
/// parsing resumes at the next line that begins with `{`. Objects without
/// both `Path` and `Version` (the main module) are not records.
fn parse_json_lines(output: &str) -> Vec<PackageRecord> {
    let mut records = Vec::new();
    let mut rest = output;

    loop {
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<ModuleEntry>();
        let mut resync_from = None;
        loop {
            let start = stream.byte_offset();
            let Some(item) = stream.next() else {
                break;
            };
            match item {
                Ok(entry) if line_rest_is_blank(&rest[stream.byte_offset()..]) => {
                    if let ModuleEntry {
                        path: Some(path),
                        version: Some(version),
                    } = entry
                    {
                        records.push(PackageRecord::installed(path, version));
                    }
                }
                Ok(_) => {
                    tracing::debug!("Skipping module entry followed by garbage");
                    resync_from = Some(start);
                    break;
                }
                Err(e) => {
                    tracing::debug!("Skipping malformed module entry: {}", e);
                    resync_from = Some(start);
                    break;
                }
            }
        }
        let Some(start) = resync_from else {
            break;
        };

        let bad_start = rest[start..]
            .find(|c: char| !c.is_whitespace())
            .map(|i| start + i)
            .unwrap_or(rest.len());
        match rest[bad_start..].find("\n{") {
            Some(i) => rest = &rest[bad_start + i + 1..],
            None => break,
        }
    }
    records
}

fn line_rest_is_blank(rest: &str) -> bool {
    rest.split('\n').next().map_or(true, |line| line.trim().is_empty())
}

fn dedup_by_name(records: Vec<PackageRecord>) -> Vec<PackageRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(records: &[PackageRecord]) -> Vec<(&str, &str)> {
        records
            .iter()
            .map(|r| (r.name.as_str(), r.version.as_str()))
            .collect()
    }

    #[test]
    fn test_json_array() {
        let out = r#"[{"name": "pip", "version": "23.2.1"}, {"name": "requests", "version": "2.31.0"}]"#;
        let records = parse_package_list(ListFormat::JsonArray, out);
        assert_eq!(names(&records), vec![("pip", "23.2.1"), ("requests", "2.31.0")]);
        assert!(records.iter().all(|r| r.installed && r.latest_version.is_none()));
    }

    #[test]
    fn test_dependency_map() {
        let out = r#"{
            "name": "demo",
            "version": "1.0.0",
            "dependencies": {
                "express": {"version": "4.18.2", "resolved": "https://registry.npmjs.org/express"},
                "left-pad": {"missing": true}
            }
        }"#;
        let records = parse_package_list(ListFormat::DependencyMap, out);
        assert_eq!(names(&records), vec![("express", "4.18.2"), ("left-pad", "")]);
    }

    #[test]
    fn test_dependency_map_without_dependencies_is_empty() {
        assert!(parse_package_list(ListFormat::DependencyMap, r#"{"name": "demo"}"#).is_empty());
    }

    #[test]
    fn test_single_document_parse_failure_returns_empty() {
        assert!(parse_package_list(ListFormat::JsonArray, "[{\"name\": ").is_empty());
        assert!(parse_package_list(ListFormat::JsonArray, "{}").is_empty());
        assert!(parse_package_list(ListFormat::DependencyMap, "npm ERR! code E404").is_empty());
    }

    #[test]
    fn test_json_lines_pretty_printed_skips_main_module() {
        let out = "{\n\t\"Path\": \"example.com/hello\",\n\t\"Main\": true,\n\t\"GoVersion\": \"1.21\"\n}\n\
                   {\n\t\"Path\": \"golang.org/x/text\",\n\t\"Version\": \"v0.14.0\",\n\t\"Indirect\": true\n}\n\
                   {\n\t\"Path\": \"rsc.io/quote\",\n\t\"Version\": \"v1.5.2\"\n}\n";
        let records = parse_package_list(ListFormat::JsonLines, out);
        assert_eq!(
            names(&records),
            vec![("golang.org/x/text", "v0.14.0"), ("rsc.io/quote", "v1.5.2")]
        );
    }

    #[test]
    fn test_json_lines_one_corrupt_line_among_valid() {
        let out = concat!(
            "{\"Path\": \"a.io/one\", \"Version\": \"v1.0.0\"}\n",
            "{\"Path\": \"b.io/two\", \"Version\": \"v2.0.0\"}\n",
            "{\"Path\": \"broken\", \"Version\": \n",
            "{\"Path\": \"c.io/three\", \"Version\": \"v3.0.0\"}\n",
            "not json at all\n",
            "{\"Path\": \"d.io/four\", \"Version\": \"v4.0.0\"}\n",
        );
        let records = parse_package_list(ListFormat::JsonLines, out);
        assert_eq!(
            names(&records),
            vec![
                ("a.io/one", "v1.0.0"),
                ("b.io/two", "v2.0.0"),
                ("c.io/three", "v3.0.0"),
                ("d.io/four", "v4.0.0"),
            ]
        );
    }

    #[test]
    fn test_json_lines_object_with_garbage_tail_is_dropped() {
        let out = concat!(
            "{\"Path\": \"a.io/one\", \"Version\": \"v1\"}\n",
            "{\"Path\": \"bad.io/x\", \"Version\": \"v9\"} <<corrupted tail>>\n",
            "{\"Path\": \"b.io/two\", \"Version\": \"v2\"}\n",
        );
        let records = parse_package_list(ListFormat::JsonLines, out);
        assert_eq!(names(&records), vec![("a.io/one", "v1"), ("b.io/two", "v2")]);
    }

    #[test]
    fn test_json_lines_trailing_garbage_is_ignored() {
        let out = "{\"Path\": \"a.io/one\", \"Version\": \"v1\"}\n{\"Path\": ";
        let records = parse_package_list(ListFormat::JsonLines, out);
        assert_eq!(names(&records), vec![("a.io/one", "v1")]);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let out = r#"[{"name": "x", "version": "1"}, {"name": "x", "version": "2"}]"#;
        assert_eq!(names(&parse_package_list(ListFormat::JsonArray, out)), vec![("x", "1")]);
    }

    #[test]
    fn test_needs_update() {
        let mut r = PackageRecord::installed("x", "1.0");
        assert!(!r.needs_update());
        r.latest_version = Some("1.0".into());
        assert!(!r.needs_update());
        r.latest_version = Some("1.1".into());
        assert!(r.needs_update());
        r.installed = false;
        assert!(!r.needs_update());
    }
}

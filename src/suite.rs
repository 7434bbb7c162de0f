//! Test descriptor loading.
//!
//! A descriptor lists the test cases of a suite:
//!
//! ```yaml
//! tests:
//!   - esModules: ./rxjs/operators.js        # a single path or a list
//!     options: { useMinifier: false }        # optional, partial checker options
//!     expectedOutput: ./snapshots/operators.txt
//! ```
//!
//! `.json` descriptors are read with `serde_json`, everything else with
//! `serde_yaml`. All paths are resolved against the descriptor's directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::checker::{CheckerOptions, CheckerOverrides};
use crate::errors::{HarnessError, Result};

// ============================================================================
// DESCRIPTOR SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct Descriptor {
    tests: Vec<TestRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestRecord {
    es_modules: ModuleList,
    #[serde(default)]
    options: CheckerOverrides,
    expected_output: PathBuf,
}

/// `esModules` may be declared as one path or an ordered list of paths.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleList {
    One(String),
    Many(Vec<String>),
}

impl ModuleList {
    fn into_vec(self) -> Vec<String> {
        match self {
            ModuleList::One(path) => vec![path],
            ModuleList::Many(paths) => paths,
        }
    }
}

// ============================================================================
// RESOLVED SUITE
// ============================================================================

/// One resolved test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// The module paths as declared in the descriptor, joined for display.
    pub description: String,
    /// Base options merged with this case's overrides; module paths resolved.
    pub options: CheckerOptions,
    /// Snapshot file holding the expected report.
    pub expected_output: PathBuf,
}

/// Ordered test cases; the order drives progress output and update order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub descriptor: PathBuf,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }
}

impl<'a> IntoIterator for &'a TestSuite {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Reads and resolves the descriptor at `descriptor` (relative to `cwd`).
pub fn load_suite(descriptor: &Path, cwd: &Path) -> Result<TestSuite> {
    let path = resolve_path(cwd, descriptor);
    if !path.is_file() {
        return Err(HarnessError::config_with_help(
            format!("test descriptor {} does not exist", path.display()),
            "check the path given to --test",
        ));
    }
    let source =
        fs::read_to_string(&path).map_err(|e| HarnessError::io("read test descriptor", &path, e))?;
    let suite = parse_suite(&source, &path, cwd)?;
    info!(descriptor = %path.display(), cases = suite.len(), "loaded test suite");
    Ok(suite)
}

/// Parses descriptor text. `descriptor` only decides the format and the
/// directory that relative paths are resolved against.
pub fn parse_suite(source: &str, descriptor: &Path, cwd: &Path) -> Result<TestSuite> {
    let parsed: Descriptor = if is_json(descriptor) {
        serde_json::from_str(source).map_err(|e| HarnessError::data(descriptor, e))?
    } else {
        serde_yaml::from_str(source).map_err(|e| HarnessError::data(descriptor, e))?
    };

    let base_dir = match descriptor.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => cwd.to_path_buf(),
    };

    let cases = parsed
        .tests
        .into_iter()
        .enumerate()
        .map(|(index, record)| build_case(index, record, &base_dir, cwd, descriptor))
        .collect::<Result<Vec<_>>>()?;

    Ok(TestSuite {
        descriptor: descriptor.to_path_buf(),
        cases,
    })
}

fn build_case(
    index: usize,
    record: TestRecord,
    base_dir: &Path,
    cwd: &Path,
    descriptor: &Path,
) -> Result<TestCase> {
    let declared = record.es_modules.into_vec();
    if declared.is_empty() {
        return Err(HarnessError::data(
            descriptor,
            format!("test #{} declares an empty esModules list", index + 1),
        ));
    }

    let resolved = declared
        .iter()
        .map(|module| resolve_path(base_dir, Path::new(module)).display().to_string())
        .collect();

    let mut overrides = record.options;
    if let Some(case_cwd) = overrides.cwd.take() {
        let case_cwd = resolve_path(base_dir, &case_cwd);
        if !case_cwd.is_dir() {
            return Err(HarnessError::data(
                descriptor,
                format!(
                    "test #{} sets cwd to {}, which is not a directory",
                    index + 1,
                    case_cwd.display()
                ),
            ));
        }
        overrides.cwd = Some(case_cwd);
    }

    let options = CheckerOptions::new(cwd, resolved)?.merge(&overrides);

    Ok(TestCase {
        description: declared.join(", "),
        options,
        expected_output: resolve_path(base_dir, &record.expected_output),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Joins `path` onto `base` unless it is already absolute, dropping `.`
/// components so `a.js` and `./a.js` resolve identically.
pub(crate) fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    base.join(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn parse(source: &str, descriptor: &str) -> Result<TestSuite> {
        parse_suite(source, Path::new(descriptor), Path::new("/work"))
    }

    #[test]
    fn single_path_and_list_normalize_identically() {
        let single = parse(
            r#"{ "tests": [ { "esModules": "a.js", "expectedOutput": "a.snap" } ] }"#,
            "/suite/tests.json",
        )
        .unwrap();
        let list = parse(
            r#"{ "tests": [ { "esModules": ["a.js"], "expectedOutput": "a.snap" } ] }"#,
            "/suite/tests.json",
        )
        .unwrap();
        assert_eq!(single, list);
        assert_eq!(single.cases[0].options.es_modules(), ["/suite/a.js".to_string()]);
    }

    #[test]
    fn paths_resolve_against_descriptor_directory() {
        let suite = parse(
            "tests:\n  - esModules: [./lib/a.js, ../b.js]\n    expectedOutput: ./out/a.txt\n",
            "/suite/nested/tests.yaml",
        )
        .unwrap();
        let case = &suite.cases[0];
        assert_eq!(
            case.options.es_modules(),
            ["/suite/nested/lib/a.js".to_string(), "/suite/nested/../b.js".to_string()]
        );
        assert_eq!(case.expected_output, PathBuf::from("/suite/nested/out/a.txt"));
        assert_eq!(case.options.cwd, PathBuf::from("/work"));
        assert_eq!(case.description, "./lib/a.js, ../b.js");
    }

    #[test]
    fn case_overrides_take_precedence() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let suite = parse_suite(
            r#"{ "tests": [
                { "esModules": "a.js", "options": { "useMinifier": false, "cwd": "pkg" },
                  "expectedOutput": "a.snap" },
                { "esModules": "b.js", "expectedOutput": "b.snap" }
            ] }"#,
            &dir.path().join("tests.json"),
            Path::new("/work"),
        )
        .unwrap();
        assert!(!suite.cases[0].options.use_minifier);
        assert_eq!(suite.cases[0].options.cwd, dir.path().join("pkg"));
        assert!(suite.cases[1].options.use_minifier);
        assert_eq!(suite.cases[1].options.cwd, PathBuf::from("/work"));
    }

    #[test]
    fn missing_case_cwd_is_a_data_error() {
        let err = parse(
            r#"{ "tests": [ { "esModules": "a.js", "options": { "cwd": "gone" }, "expectedOutput": "a" } ] }"#,
            "/definitely/not/here/tests.json",
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Data { .. }));
        assert!(err.to_string().contains("test #1"));
    }

    #[test]
    fn descriptor_metadata_fields_are_ignored() {
        let suite = parse(
            r#"{ "$schema": "./tests.schema.json",
                 "tests": [ { "description": "operators", "esModules": "a.js", "expectedOutput": "a" } ] }"#,
            "/suite/tests.json",
        )
        .unwrap();
        assert_eq!(suite.len(), 1);
        assert_eq!(suite.cases[0].description, "a.js");
    }

    #[test]
    fn keeps_descriptor_order() {
        let suite = parse(
            "tests:\n  - { esModules: c.js, expectedOutput: c }\n  - { esModules: a.js, expectedOutput: a }\n  - { esModules: b.js, expectedOutput: b }\n",
            "/suite/tests.yml",
        )
        .unwrap();
        let order: Vec<_> = suite.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(order, ["c.js", "a.js", "b.js"]);
    }

    #[test]
    fn malformed_descriptor_is_a_data_error() {
        let err = parse(r#"{ "tests": [ { "esModules": 3 } ] }"#, "/suite/tests.json").unwrap_err();
        assert!(matches!(err, HarnessError::Data { .. }));

        let err = parse("tests: [", "/suite/tests.yaml").unwrap_err();
        assert!(matches!(err, HarnessError::Data { .. }));
    }

    #[test]
    fn empty_module_list_is_a_data_error() {
        let err = parse(
            r#"{ "tests": [ { "esModules": [], "expectedOutput": "a.snap" } ] }"#,
            "/suite/tests.json",
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Data { .. }));
        assert!(err.to_string().contains("test #1"));
    }

    #[test]
    fn output_cannot_be_overridden_per_case() {
        let err = parse(
            r#"{ "tests": [ { "esModules": "a.js", "options": { "output": "b.js" }, "expectedOutput": "a" } ] }"#,
            "/suite/tests.json",
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Data { .. }));
    }

    #[test]
    fn missing_descriptor_is_a_configuration_error() {
        let err = load_suite(Path::new("does/not/exist.json"), Path::new("/nowhere")).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration { .. }));
        assert!(err.to_string().contains("/nowhere/does/not/exist.json"));
    }
}

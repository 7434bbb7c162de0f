//! Snapshot comparison.
//!
//! A snapshot is a plain text file holding the exact report the checker
//! produced for a test case. A missing snapshot compares as the empty string,
//! so a brand-new case fails with a diff that inserts the whole report.

use std::fs;
use std::io;
use std::path::Path;

use similar::TextDiff;
use tracing::{debug, info};

use crate::checker::{CheckOutput, Checker};
use crate::errors::{CheckerError, HarnessError, Result};
use crate::suite::TestCase;

/// Lines of unchanged context shown around each diff hunk.
const DIFF_CONTEXT: usize = 3;

/// A test case whose report did not match its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedExpectation {
    pub description: String,
    /// Unified diff turning the expected snapshot into the actual report.
    pub diff: String,
}

/// Runs the checker for `case` and compares the report with its snapshot.
///
/// Returns `Ok(None)` when they match. On mismatch the failure is returned
/// and, in update mode, the snapshot is rewritten with the actual report.
pub fn compare_case(
    case: &TestCase,
    checker: &dyn Checker,
    update: bool,
) -> Result<Option<FailedExpectation>> {
    let actual = match checker.check(&case.options) {
        Ok(CheckOutput::Report(report)) => report,
        Ok(CheckOutput::BundleWritten(path)) => {
            return Err(HarnessError::Invocation {
                description: case.description.clone(),
                source: CheckerError::Other(format!(
                    "checker wrote a bundle to {} instead of returning a report",
                    path.display()
                )),
            })
        }
        Err(source) => {
            return Err(HarnessError::Invocation {
                description: case.description.clone(),
                source,
            })
        }
    };

    let expected = read_snapshot(&case.expected_output)?;
    if actual == expected {
        debug!(case = %case.description, "snapshot matches");
        return Ok(None);
    }

    let diff = unified_diff(&expected, &actual, &case.expected_output);
    if update {
        write_snapshot(&case.expected_output, &actual)?;
    }

    Ok(Some(FailedExpectation {
        description: case.description.clone(),
        diff,
    }))
}

/// Reads a snapshot; a missing file is the empty string.
pub fn read_snapshot(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(HarnessError::io("read snapshot", path, e)),
    }
}

/// Writes `content` to `path`, creating missing parent directories first.
pub fn write_snapshot(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, content).map_err(|e| HarnessError::io("write snapshot", path, e))?;
    info!(snapshot = %path.display(), "updated snapshot");
    Ok(())
}

/// Creates the parent directory of `path` and any missing ancestors.
/// Succeeds without touching anything when the directory already exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|e| HarnessError::io("create directory", parent, e))
}

/// Unified diff from `expected` to `actual`, both sides labeled with `path`.
pub fn unified_diff(expected: &str, actual: &str, path: &Path) -> String {
    let label = path.display().to_string();
    let diff = TextDiff::from_lines(expected, actual);
    let mut unified = diff.unified_diff();
    unified.context_radius(DIFF_CONTEXT).header(&label, &label);
    unified.to_string()
}

//! Error types for the snapshot harness.
//!
//! Every fatal condition is a [`HarnessError`] variant. Snapshot mismatches are
//! not errors: they are collected as [`crate::snapshot::FailedExpectation`]
//! values and only turn into [`HarnessError::AggregateFailure`] once the full
//! report has been printed.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Failure reported by a [`crate::checker::Checker`] implementation.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with status {status}: {stderr}")]
    Exit {
        program: String,
        status: i32,
        stderr: String,
    },
    #[error("checker output is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0}")]
    Other(String),
}

/// Unified error type for every way a harness run can abort.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    /// Bad invocation: missing descriptor, no modules, unusable flags.
    #[error("{message}")]
    #[diagnostic(code(check_side_effects::config))]
    Configuration {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The test descriptor exists but its content is malformed.
    #[error("invalid test descriptor {}: {message}", path.display())]
    #[diagnostic(
        code(check_side_effects::data),
        help("expected a `tests` list whose records carry `esModules` and `expectedOutput`")
    )]
    Data { path: PathBuf, message: String },

    /// The checker itself failed; fatal for the whole run.
    #[error("checker failed for {description}")]
    #[diagnostic(code(check_side_effects::checker))]
    Invocation {
        description: String,
        #[source]
        source: CheckerError,
    },

    #[error("could not {action} {}", path.display())]
    #[diagnostic(code(check_side_effects::io))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write report output")]
    #[diagnostic(code(check_side_effects::io))]
    Output(#[from] io::Error),

    /// One or more snapshot expectations failed outside update mode.
    #[error("{count} snapshot expectation(s) failed")]
    #[diagnostic(
        code(check_side_effects::failed),
        help("re-run with: {reproduce}")
    )]
    AggregateFailure { count: usize, reproduce: String },
}

impl HarnessError {
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        HarnessError::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn data(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        HarnessError::Data {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// True for the end-of-run mismatch summary; every other variant aborts
    /// before the report is complete.
    pub fn is_aggregate_failure(&self) -> bool {
        matches!(self, HarnessError::AggregateFailure { .. })
    }
}

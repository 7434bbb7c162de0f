//! Snapshot regression harness for a module side-effect checker.
//!
//! The harness drives an external checker over the cases listed in a test
//! descriptor, compares each report with a stored snapshot, and either
//! reports the mismatches or rewrites the snapshots in update mode.

pub use crate::checker::{CheckOutput, Checker, CheckerOptions, CheckerOverrides, CommandChecker};
pub use crate::cli::{resolve_args, RunConfig, RunMode};
pub use crate::errors::{CheckerError, HarnessError, Result};
pub use crate::report::{ColorMode, Reporter, Verdict};
pub use crate::runner::{run, Outcome};
pub use crate::snapshot::FailedExpectation;
pub use crate::suite::{load_suite, TestCase, TestSuite};

pub mod checker;
pub mod cli;
pub mod errors;
pub mod logging;
pub mod report;
pub mod runner;
pub mod snapshot;
pub mod suite;

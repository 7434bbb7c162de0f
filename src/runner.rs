//! The run driver.
//!
//! Help prints usage. A single run forwards the options to the checker and
//! prints whatever it reports. A suite run loads the descriptor, then for
//! each case in order prints a progress line, runs the checker and compares
//! the snapshot. Mismatches are collected and reported together at the end;
//! any other error aborts the run immediately.

use std::path::Path;

use termcolor::WriteColor;
use tracing::info;

use crate::checker::{CheckOutput, Checker, CheckerOptions};
use crate::cli::{RunConfig, RunMode};
use crate::errors::{HarnessError, Result};
use crate::report::{Reporter, Verdict};
use crate::snapshot::compare_case;
use crate::suite::load_suite;

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Help,
    /// Single run; carries the checker's output.
    Checked(CheckOutput),
    /// Suite run that passed or repaired its snapshots.
    Suite(Verdict),
}

/// Executes `config`. A suite with mismatching snapshots outside update mode
/// returns [`HarnessError::AggregateFailure`] after the full report is written.
pub fn run<W: WriteColor>(
    config: &RunConfig,
    checker: &dyn Checker,
    reporter: &mut Reporter<W>,
) -> Result<Outcome> {
    match &config.mode {
        RunMode::Help(text) => {
            reporter.raw(text)?;
            Ok(Outcome::Help)
        }
        RunMode::Single(options) => run_single(options, checker, reporter).map(Outcome::Checked),
        RunMode::Suite { descriptor, update } => run_suite(
            descriptor,
            *update,
            &config.cwd,
            &config.reproduce_command(),
            checker,
            reporter,
        )
        .map(Outcome::Suite),
    }
}

fn run_single<W: WriteColor>(
    options: &CheckerOptions,
    checker: &dyn Checker,
    reporter: &mut Reporter<W>,
) -> Result<CheckOutput> {
    let output = checker
        .check(options)
        .map_err(|source| HarnessError::Invocation {
            description: options.describe(),
            source,
        })?;
    match &output {
        CheckOutput::Report(report) => reporter.raw(report)?,
        CheckOutput::BundleWritten(path) => {
            info!(bundle = %path.display(), "bundle written")
        }
    }
    Ok(output)
}

/// Evaluates every case of the descriptor strictly in order.
pub fn run_suite<W: WriteColor>(
    descriptor: &Path,
    update: bool,
    cwd: &Path,
    reproduce: &str,
    checker: &dyn Checker,
    reporter: &mut Reporter<W>,
) -> Result<Verdict> {
    let suite = load_suite(descriptor, cwd)?;

    let mut failures = Vec::new();
    for case in &suite {
        reporter.progress(&case.description)?;
        if let Some(failure) = compare_case(case, checker, update)? {
            failures.push(failure);
        }
    }

    match reporter.finish(&failures, update, reproduce)? {
        Verdict::Failed(count) => Err(HarnessError::AggregateFailure {
            count,
            reproduce: reproduce.to_string(),
        }),
        verdict => Ok(verdict),
    }
}

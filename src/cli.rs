//! Command-line surface.
//!
//! Turns the raw argument vector into a [`RunConfig`] and hosts the process
//! entry point used by `main`.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use tracing::warn;

use crate::checker::{CheckerOptions, CommandChecker, DEFAULT_CHECKER_PROGRAM};
use crate::errors::{HarnessError, Result};
use crate::logging::init_logging;
use crate::report::{ColorMode, Reporter};
use crate::runner;
use crate::suite::resolve_path;

const BIN_NAME: &str = "check-side-effects";

/// Launchers that run the harness as a script: `<interpreter> <script> ...`.
const INTERPRETER_NAMES: &[&str] = &["node", "node.exe", "nodejs", "nodejs.exe"];

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

/// Check ES modules for side effects triggered by importing them.
///
/// With `--test`, runs every case of a test descriptor and compares the
/// reports with stored snapshots.
#[derive(Debug, Parser)]
#[command(name = BIN_NAME, version, disable_help_flag = true)]
pub struct CliArgs {
    /// Print this help text.
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Working directory for the checker [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Write the bundle to this file instead of printing a report.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Treat property reads as side effects.
    #[arg(long, value_name = "BOOL", default_value_t = true, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub property_read_side_effects: bool,

    /// Resolve imports that point outside the analysed modules.
    #[arg(long, value_name = "BOOL", default_value_t = false, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub resolve_externals: bool,

    /// Print the dependencies of each module.
    #[arg(long, value_name = "BOOL", default_value_t = false, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub print_dependencies: bool,

    /// Run the build optimizer before checking.
    #[arg(long, value_name = "BOOL", default_value_t = true, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub use_build_optimizer: bool,

    /// Minify the bundle before checking.
    #[arg(long, value_name = "BOOL", default_value_t = true, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub use_minifier: bool,

    /// Show bundler warnings.
    #[arg(long, value_name = "BOOL", default_value_t = false, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub warnings: bool,

    /// Run the test cases listed in this descriptor file.
    #[arg(long, value_name = "FILE")]
    pub test: Option<PathBuf>,

    /// Rewrite failing snapshots with the actual output.
    #[arg(long, value_name = "BOOL", default_value_t = false, num_args = 0..=1,
          require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub update: bool,

    /// Analysis engine to run.
    #[arg(long, value_name = "PROGRAM", env = "CHECK_SIDE_EFFECTS_CHECKER",
          default_value = DEFAULT_CHECKER_PROGRAM)]
    pub checker: PathBuf,

    /// When to color the report.
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Module paths to check (ignored with --test).
    #[arg(value_name = "MODULE")]
    pub modules: Vec<String>,
}

// ============================================================================
// RUN CONFIGURATION
// ============================================================================

/// What a run does. The modes are mutually exclusive: only a single run may
/// write a bundle, and only a suite run compares snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Print usage (or version) text and exit successfully.
    Help(String),
    Single(CheckerOptions),
    Suite { descriptor: PathBuf, update: bool },
}

/// Fully resolved invocation; built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub cwd: PathBuf,
    /// The raw argument vector, kept for the reproduction command.
    pub argv: Vec<String>,
    pub checker: PathBuf,
    pub color: ColorMode,
    pub mode: RunMode,
}

impl RunConfig {
    /// The original command line with `--update` appended.
    pub fn reproduce_command(&self) -> String {
        let mut parts: Vec<String> = self
            .argv
            .iter()
            .filter(|arg| *arg != "--update" && !arg.starts_with("--update="))
            .map(|arg| shell_quote(arg))
            .collect();
        parts.push("--update".to_string());
        parts.join(" ")
    }
}

/// Resolves the raw argument vector (including the program name, and the
/// interpreter when run as a script) into a [`RunConfig`].
pub fn resolve_args(argv: Vec<String>, process_cwd: &Path) -> Result<RunConfig> {
    let rest = &argv[leading_tokens(&argv)..];
    let args = match CliArgs::try_parse_from(
        std::iter::once(BIN_NAME).chain(rest.iter().map(String::as_str)),
    ) {
        Ok(args) => args,
        Err(err) if err.kind() == ErrorKind::DisplayVersion => {
            return Ok(RunConfig {
                cwd: process_cwd.to_path_buf(),
                checker: PathBuf::from(DEFAULT_CHECKER_PROGRAM),
                color: ColorMode::Auto,
                mode: RunMode::Help(err.to_string()),
                argv,
            });
        }
        Err(err) => {
            return Err(HarnessError::config_with_help(
                err.to_string().trim_start_matches("error: ").trim_end().to_string(),
                "run with --help for usage",
            ))
        }
    };

    let cwd = match &args.cwd {
        Some(dir) => {
            let dir = resolve_path(process_cwd, dir);
            if !dir.is_dir() {
                return Err(HarnessError::config_with_help(
                    format!("working directory {} does not exist", dir.display()),
                    "check the path given to --cwd",
                ));
            }
            dir
        }
        None => process_cwd.to_path_buf(),
    };

    let mode = if args.help {
        RunMode::Help(CliArgs::command().render_help().to_string())
    } else if let Some(descriptor) = &args.test {
        if !args.modules.is_empty() || args.output.is_some() {
            warn!("module arguments and --output are ignored with --test");
        }
        RunMode::Suite {
            descriptor: resolve_path(process_cwd, descriptor),
            update: args.update,
        }
    } else {
        let mut options = CheckerOptions::new(&cwd, args.modules.clone())?;
        options.output = args.output.clone();
        options.property_read_side_effects = args.property_read_side_effects;
        options.resolve_externals = args.resolve_externals;
        options.print_dependencies = args.print_dependencies;
        options.use_build_optimizer = args.use_build_optimizer;
        options.use_minifier = args.use_minifier;
        options.warnings = args.warnings;
        RunMode::Single(options)
    };

    Ok(RunConfig {
        cwd,
        argv,
        checker: args.checker,
        color: args.color,
        mode,
    })
}

/// Number of leading tokens that name the launcher rather than arguments:
/// two for `<interpreter> <script>`, one for a standalone binary.
fn leading_tokens(argv: &[String]) -> usize {
    match argv.first() {
        Some(first) if is_interpreter(first) => argv.len().min(2),
        Some(_) => 1,
        None => 0,
    }
}

fn is_interpreter(token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    INTERPRETER_NAMES.iter().any(|name| token.ends_with(name))
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Runs the harness for the current process and maps the outcome to an exit code.
pub fn run() -> ExitCode {
    init_logging();
    // Checker stderr is quoted verbatim in diagnostics; keep it on one line.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .wrap_lines(false)
                .context_lines(3)
                .build(),
        )
    }));
    let argv: Vec<String> = env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let result = env::current_dir()
        .map_err(|e| HarnessError::io("read current directory", ".", e))
        .and_then(|cwd| resolve_args(argv, &cwd))
        .and_then(|config| {
            let checker = CommandChecker::new(&config.checker);
            let mut reporter = Reporter::stdout(config.color);
            runner::run(&config, &checker, &mut reporter)
        });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        // The reporter has already printed the diffs and the update command.
        Err(e) if e.is_aggregate_failure() => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::FAILURE
        }
    }
}

//! The side-effect checker contract.
//!
//! The harness never analyses modules itself. It assembles a
//! [`CheckerOptions`] for each run or test case and hands it to a [`Checker`].
//! [`CommandChecker`] is the production implementation: it runs the analysis
//! engine as a child process and captures its report from stdout.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{CheckerError, HarnessError, Result};

/// Engine program used when neither `--checker` nor the environment names one.
pub const DEFAULT_CHECKER_PROGRAM: &str = "check-side-effects-engine";

/// Everything the checker needs to analyse one set of modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerOptions {
    pub cwd: PathBuf,
    /// When set, the checker writes a bundle here instead of returning a report.
    pub output: Option<PathBuf>,
    pub property_read_side_effects: bool,
    pub resolve_externals: bool,
    pub print_dependencies: bool,
    pub use_build_optimizer: bool,
    pub use_minifier: bool,
    pub warnings: bool,
    es_modules: Vec<String>,
}

impl CheckerOptions {
    /// Builds options with default toggles. Fails if `es_modules` is empty.
    pub fn new(cwd: impl Into<PathBuf>, es_modules: Vec<String>) -> Result<Self> {
        if es_modules.is_empty() {
            return Err(HarnessError::config_with_help(
                "must provide at least one module",
                "pass module paths as positional arguments, or use --test <descriptor>",
            ));
        }
        Ok(Self {
            cwd: cwd.into(),
            output: None,
            property_read_side_effects: true,
            resolve_externals: false,
            print_dependencies: false,
            use_build_optimizer: true,
            use_minifier: true,
            warnings: false,
            es_modules,
        })
    }

    pub fn es_modules(&self) -> &[String] {
        &self.es_modules
    }

    /// Human-readable module list used in progress lines and failure headers.
    pub fn describe(&self) -> String {
        self.es_modules.join(", ")
    }

    /// Applies a partial override; every field the override sets wins.
    pub fn merge(mut self, overrides: &CheckerOverrides) -> Self {
        if let Some(cwd) = &overrides.cwd {
            self.cwd = cwd.clone();
        }
        if let Some(v) = overrides.property_read_side_effects {
            self.property_read_side_effects = v;
        }
        if let Some(v) = overrides.resolve_externals {
            self.resolve_externals = v;
        }
        if let Some(v) = overrides.print_dependencies {
            self.print_dependencies = v;
        }
        if let Some(v) = overrides.use_build_optimizer {
            self.use_build_optimizer = v;
        }
        if let Some(v) = overrides.use_minifier {
            self.use_minifier = v;
        }
        if let Some(v) = overrides.warnings {
            self.warnings = v;
        }
        self
    }

    /// Renders the options as engine command-line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--cwd".to_string(), self.cwd.display().to_string()];
        if let Some(output) = &self.output {
            args.push("--output".to_string());
            args.push(output.display().to_string());
        }
        let toggles = [
            ("property-read-side-effects", self.property_read_side_effects),
            ("resolve-externals", self.resolve_externals),
            ("print-dependencies", self.print_dependencies),
            ("use-build-optimizer", self.use_build_optimizer),
            ("use-minifier", self.use_minifier),
            ("warnings", self.warnings),
        ];
        for (name, value) in toggles {
            args.push(format!("--{name}={value}"));
        }
        args.push("--".to_string());
        args.extend(self.es_modules.iter().cloned());
        args
    }
}

/// Partial checker options declared per test case in a descriptor.
///
/// Module paths and the output bundle cannot be overridden; unknown keys are
/// rejected so a typo does not silently fall back to a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckerOverrides {
    pub cwd: Option<PathBuf>,
    pub property_read_side_effects: Option<bool>,
    pub resolve_externals: Option<bool>,
    pub print_dependencies: Option<bool>,
    pub use_build_optimizer: Option<bool>,
    pub use_minifier: Option<bool>,
    pub warnings: Option<bool>,
}

/// What a checker invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutput {
    /// The textual side-effect report.
    Report(String),
    /// A bundle was written to this path; nothing comparable was returned.
    BundleWritten(PathBuf),
}

/// The external side-effect analysis capability.
pub trait Checker {
    fn check(&self, options: &CheckerOptions) -> Result<CheckOutput, CheckerError>;
}

impl<F> Checker for F
where
    F: Fn(&CheckerOptions) -> Result<CheckOutput, CheckerError>,
{
    fn check(&self, options: &CheckerOptions) -> Result<CheckOutput, CheckerError> {
        self(options)
    }
}

/// Runs the analysis engine as a child process.
#[derive(Debug, Clone)]
pub struct CommandChecker {
    program: PathBuf,
}

impl CommandChecker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Checker for CommandChecker {
    fn check(&self, options: &CheckerOptions) -> Result<CheckOutput, CheckerError> {
        let program = self.program.display().to_string();
        let args = options.to_args();
        debug!(program = %program, ?args, "invoking checker");

        let output = duct::cmd(self.program.as_path(), &args)
            .dir(&options.cwd)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| CheckerError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CheckerError::Exit {
                program,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match &options.output {
            Some(path) => Ok(CheckOutput::BundleWritten(path.clone())),
            None => String::from_utf8(output.stdout)
                .map(CheckOutput::Report)
                .map_err(|_| CheckerError::InvalidUtf8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(modules: &[&str]) -> CheckerOptions {
        CheckerOptions::new("/work", modules.iter().map(|m| m.to_string()).collect())
            .expect("non-empty module list")
    }

    #[test]
    fn empty_module_list_is_a_configuration_error() {
        let err = CheckerOptions::new("/work", vec![]).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration { .. }));
        assert_eq!(err.to_string(), "must provide at least one module");
    }

    #[test]
    fn defaults_match_the_cli_defaults() {
        let opts = options(&["a.js"]);
        assert!(opts.property_read_side_effects);
        assert!(!opts.resolve_externals);
        assert!(!opts.print_dependencies);
        assert!(opts.use_build_optimizer);
        assert!(opts.use_minifier);
        assert!(!opts.warnings);
        assert_eq!(opts.output, None);
    }

    #[test]
    fn overrides_win_only_where_specified() {
        let overrides = CheckerOverrides {
            use_minifier: Some(false),
            warnings: Some(true),
            ..CheckerOverrides::default()
        };
        let merged = options(&["a.js"]).merge(&overrides);
        assert!(!merged.use_minifier);
        assert!(merged.warnings);
        assert!(merged.use_build_optimizer);
        assert_eq!(merged.cwd, PathBuf::from("/work"));
        assert_eq!(merged.es_modules(), ["a.js".to_string()]);
    }

    #[test]
    fn renders_engine_arguments_in_order() {
        let mut opts = options(&["a.js", "b.js"]);
        opts.output = Some(PathBuf::from("out.js"));
        let args = opts.to_args();
        assert_eq!(&args[..4], ["--cwd", "/work", "--output", "out.js"]);
        assert!(args.contains(&"--use-minifier=true".to_string()));
        assert!(args.contains(&"--warnings=false".to_string()));
        assert_eq!(&args[args.len() - 3..], ["--", "a.js", "b.js"]);
    }

    #[test]
    fn closures_are_checkers() {
        let checker = |opts: &CheckerOptions| -> Result<CheckOutput, CheckerError> {
            Ok(CheckOutput::Report(opts.describe()))
        };
        let result = checker.check(&options(&["a.js", "b.js"])).unwrap();
        assert_eq!(result, CheckOutput::Report("a.js, b.js".to_string()));
    }

    #[test]
    fn overrides_reject_unknown_keys() {
        let parsed: Result<CheckerOverrides, _> =
            serde_json::from_str(r#"{ "output": "bundle.js" }"#);
        assert!(parsed.is_err());
        let parsed: CheckerOverrides =
            serde_json::from_str(r#"{ "useMinifier": false }"#).unwrap();
        assert_eq!(parsed.use_minifier, Some(false));
    }

    #[cfg(unix)]
    #[test]
    fn missing_engine_program_is_a_spawn_error() {
        let checker = CommandChecker::new("/nonexistent/engine-binary");
        let mut opts = options(&["a.js"]);
        opts.cwd = std::env::temp_dir();
        let err = checker.check(&opts).unwrap_err();
        assert!(matches!(err, CheckerError::Spawn { .. }));
    }
}

//! User-facing run output: progress lines, failure diffs and the summary.
//!
//! Everything is written through a [`WriteColor`] sink so the same code drives
//! the terminal and captured buffers in tests.

use std::io::{self, Write};

use clap::ValueEnum;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::snapshot::FailedExpectation;

/// `--color` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn color_choice(self) -> ColorChoice {
        match self {
            ColorMode::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

/// How a suite run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllPassed,
    /// Mismatching snapshots were rewritten.
    Updated(usize),
    Failed(usize),
}

pub struct Reporter<W> {
    out: W,
}

impl Reporter<StandardStream> {
    pub fn stdout(color: ColorMode) -> Self {
        Self::new(StandardStream::stdout(color.color_choice()))
    }
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Announces a case before its (possibly slow) checker run.
    pub fn progress(&mut self, description: &str) -> io::Result<()> {
        writeln!(self.out, "Running test for {description}...")?;
        self.out.flush()
    }

    /// Prints every failure and the closing summary.
    ///
    /// `reproduce` is the command that regenerates the snapshots; it is only
    /// shown when the run fails.
    pub fn finish(
        &mut self,
        failures: &[FailedExpectation],
        update: bool,
        reproduce: &str,
    ) -> io::Result<Verdict> {
        if failures.is_empty() {
            self.colored(Color::Green, true, "All snapshot expectations passed.")?;
            return Ok(Verdict::AllPassed);
        }

        for failure in failures {
            writeln!(self.out)?;
            self.colored(
                Color::Red,
                true,
                &format!("Test for {} failed:", failure.description),
            )?;
            self.print_diff(&failure.diff)?;
        }
        writeln!(self.out)?;

        if update {
            self.colored(
                Color::Yellow,
                true,
                &format!("Updated {} snapshot expectation(s).", failures.len()),
            )?;
            return Ok(Verdict::Updated(failures.len()));
        }

        self.colored(
            Color::Red,
            true,
            &format!("{} snapshot expectation(s) failed.", failures.len()),
        )?;
        writeln!(self.out, "To update the snapshots, run:")?;
        writeln!(self.out, "    {reproduce}")?;
        Ok(Verdict::Failed(failures.len()))
    }

    /// Writes single-run output verbatim.
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        if !text.is_empty() && !text.ends_with('\n') {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn print_diff(&mut self, diff: &str) -> io::Result<()> {
        for line in diff.lines() {
            let mut spec = ColorSpec::new();
            if line.starts_with("+++") || line.starts_with("---") {
                spec.set_bold(true);
            } else if line.starts_with("@@") {
                spec.set_fg(Some(Color::Cyan));
            } else if line.starts_with('+') {
                spec.set_fg(Some(Color::Green));
            } else if line.starts_with('-') {
                spec.set_fg(Some(Color::Red));
            }
            self.out.set_color(&spec)?;
            write!(self.out, "{line}")?;
            self.out.reset()?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn colored(&mut self, color: Color, bold: bool, text: &str) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
        write!(self.out, "{text}")?;
        self.out.reset()?;
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use termcolor::Buffer;

    use super::*;

    fn output(reporter: Reporter<Buffer>) -> String {
        String::from_utf8(reporter.into_inner().into_inner()).unwrap()
    }

    fn failure(description: &str) -> FailedExpectation {
        FailedExpectation {
            description: description.to_string(),
            diff: "--- a.snap\n+++ a.snap\n@@ -0,0 +1 @@\n+X\n".to_string(),
        }
    }

    #[test]
    fn success_prints_no_diffs() {
        let mut reporter = Reporter::new(Buffer::no_color());
        reporter.progress("a.js").unwrap();
        let verdict = reporter.finish(&[], false, "unused").unwrap();
        assert_eq!(verdict, Verdict::AllPassed);
        assert_eq!(
            output(reporter),
            "Running test for a.js...\nAll snapshot expectations passed.\n"
        );
    }

    #[test]
    fn failure_prints_diff_and_reproduction_command() {
        let mut reporter = Reporter::new(Buffer::no_color());
        let verdict = reporter
            .finish(&[failure("a.js")], false, "check-side-effects --test t.json --update")
            .unwrap();
        assert_eq!(verdict, Verdict::Failed(1));
        let text = output(reporter);
        assert!(text.contains("Test for a.js failed:\n--- a.snap\n"));
        assert!(text.contains("1 snapshot expectation(s) failed."));
        assert!(text.contains("    check-side-effects --test t.json --update\n"));
    }

    #[test]
    fn update_mode_reports_count_and_succeeds() {
        let mut reporter = Reporter::new(Buffer::no_color());
        let verdict = reporter
            .finish(&[failure("a.js"), failure("b.js")], true, "unused")
            .unwrap();
        assert_eq!(verdict, Verdict::Updated(2));
        let text = output(reporter);
        assert!(text.contains("Updated 2 snapshot expectation(s)."));
        assert!(!text.contains("To update the snapshots"));
    }

    #[test]
    fn ansi_output_colors_diff_lines() {
        let mut reporter = Reporter::new(Buffer::ansi());
        reporter.finish(&[failure("a.js")], true, "unused").unwrap();
        let text = output(reporter);
        assert!(text.contains("\x1b[0m\x1b[32m+X"));
    }

    #[test]
    fn raw_output_ends_with_newline() {
        let mut reporter = Reporter::new(Buffer::no_color());
        reporter.raw("report").unwrap();
        assert_eq!(output(reporter), "report\n");
    }
}

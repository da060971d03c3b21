//! Progress indicators with CI fallback

use super::context::UiContext;
use super::format::format_duration;
use crate::build::{UnitReport, UnitStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Unit-by-unit build progress.
///
/// An indicatif bar in interactive mode; one line per finished unit in CI.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, total_units: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total_units as u64);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.blue} Building  {bar:20.blue/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(
                template
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Building {} units...", total_units);
            None
        };
        Self { bar }
    }

    /// Record a finished unit
    pub fn on_unit(&self, report: &UnitReport) {
        let line = describe_unit(report);
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(line);
            }
            None => println!("  {}", line),
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// One-line summary of a unit outcome
pub fn describe_unit(report: &UnitReport) -> String {
    match &report.status {
        UnitStatus::Built => format!("{} built in {}", report.name, format_duration(report.duration)),
        UnitStatus::Fresh => format!("{} up to date", report.name),
        UnitStatus::Failed { command, reason } => {
            format!("{} failed: `{}` ({})", report.name, command, reason)
        }
        UnitStatus::NotRun => format!("{} not run", report.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(status: UnitStatus) -> UnitReport {
        UnitReport {
            name: "cargo".to_string(),
            status,
            duration: Duration::from_millis(1500),
            outputs: Vec::new(),
        }
    }

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Testing...");
        spinner.stop("Done");
    }

    #[test]
    fn describes_each_status() {
        assert_eq!(describe_unit(&report(UnitStatus::Built)), "cargo built in 1.5s");
        assert_eq!(describe_unit(&report(UnitStatus::Fresh)), "cargo up to date");
        assert_eq!(describe_unit(&report(UnitStatus::NotRun)), "cargo not run");
        assert_eq!(
            describe_unit(&report(UnitStatus::Failed {
                command: "cargo build".to_string(),
                reason: "timeout".to_string(),
            })),
            "cargo failed: `cargo build` (timeout)"
        );
    }

    #[test]
    fn build_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = BuildProgress::new(&ctx, 2);
        progress.on_unit(&report(UnitStatus::Built));
        progress.on_unit(&report(UnitStatus::Fresh));
        progress.finish();
    }
}

//! Output formatting and progress reporting

use crate::commands::ReportFormat;
use crate::error::CliResult;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::time::Duration;
use webverify::{
    CleanupOutcome, RunListener, RunReport, Scenario, ScenarioReport, ScenarioStatus, StepRecord,
    StepState,
};

/// Progress reporter for scenario execution (stderr)
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Add a progress bar over `total` scenarios
    #[must_use]
    pub fn with_progress(mut self, total: u64, message: &str) -> Self {
        if self.quiet {
            return self;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
        self
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_hidden() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn prefixed(&self, symbol: &str, plain: &str, paint: fn(&str) -> String, message: &str) {
        let prefix = if self.use_color {
            paint(symbol)
        } else {
            plain.to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("✓", "PASS", |s| style(s).green().bold().to_string(), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        self.prefixed("✗", "FAIL", |s| style(s).red().bold().to_string(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("⚠", "WARN", |s| style(s).yellow().bold().to_string(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("ℹ", "INFO", |s| style(s).blue().bold().to_string(), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, run: &RunReport, duration: Duration) {
        let passed = run.count(ScenarioStatus::Passed);
        let failed = run.count(ScenarioStatus::Failed);
        let cleanup = run.count(ScenarioStatus::CleanupFailed);
        let skipped = run.count(ScenarioStatus::Pending);
        if self.quiet && failed == 0 {
            return;
        }
        let total = run.scenarios.len();
        let secs = duration.as_secs_f64();

        self.line("");
        if self.use_color {
            let green = Style::new().green().bold();
            let red = Style::new().red().bold();
            let yellow = Style::new().yellow();
            let status = if failed > 0 {
                red.apply_to("FAILED")
            } else {
                green.apply_to("PASSED")
            };
            self.line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({} passed, {} failed, {} cleanup warnings, {} skipped)",
                green.apply_to(passed),
                if failed > 0 {
                    red.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                yellow.apply_to(cleanup),
                skipped
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed, {cleanup} cleanup warnings, {skipped} skipped)"
            ));
        }
    }
}

impl RunListener for ProgressReporter {
    fn scenario_started(&self, scenario: &Scenario) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(scenario.name.clone());
        }
        if scenario.description.is_empty() {
            self.header(&scenario.name);
        } else {
            self.header(&format!("{}: {}", scenario.name, scenario.description));
        }
    }

    fn step_finished(&self, _scenario: &str, index: usize, record: &StepRecord) {
        let label = format!("{}. {} ({} ms)", index + 1, record.name, record.duration_ms);
        match record.state {
            StepState::Passed => match record.checkpoint {
                Some(ref path) => self.success(&format!("{label} [{}]", path.display())),
                None => self.success(&label),
            },
            StepState::Failed => {
                let error = record.error.as_deref().unwrap_or("failed");
                self.failure(&format!("{label}: {error}"));
            }
            StepState::Pending | StepState::Running => {}
        }
    }

    fn cleanup_finished(&self, scenario: &str, outcome: &CleanupOutcome) {
        match outcome {
            CleanupOutcome::Converged { removed } => {
                self.info(&format!("{scenario}: cleanup removed {removed} record(s)"));
            }
            CleanupOutcome::Incomplete { removed, remaining } => self.warning(&format!(
                "{scenario}: cleanup removed {removed}, {remaining} still present"
            )),
        }
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        match report.status {
            ScenarioStatus::Passed => self.success(&format!("{} passed", report.name)),
            ScenarioStatus::CleanupFailed => self.warning(&format!(
                "{} passed, cleanup failed: {}",
                report.name,
                report.error.as_deref().unwrap_or("unknown")
            )),
            _ => {
                self.failure(&format!(
                    "{} failed: {}",
                    report.name,
                    report.error.as_deref().unwrap_or("unknown")
                ));
                if let Some(ref artifact) = report.diagnostics {
                    self.info(&format!("diagnostics: {}", artifact.sidecar.display()));
                }
            }
        }
    }
}

// =============================================================================
// REPORT RENDERING
// =============================================================================

/// Render the run report for stdout
pub fn render_report(run: &RunReport, format: ReportFormat) -> CliResult<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(run)?),
        ReportFormat::Text => Ok(render_text(run)),
    }
}

fn render_text(run: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "run {} against {}", run.run_id, run.base_url);
    for s in &run.scenarios {
        let _ = writeln!(
            out,
            "{:<16} {:<15} {:>3}/{:<3} steps {:>7} ms",
            s.name,
            s.status.to_string(),
            s.passed_steps(),
            s.steps.len(),
            s.duration_ms
        );
        if let Some((index, step)) = s.failed_step() {
            let _ = writeln!(out, "    step {index} '{}' failed", step.name);
        }
        if let Some(ref error) = s.error {
            let _ = writeln!(out, "    {error}");
        }
        if let Some(ref artifact) = s.diagnostics {
            if let Some(ref shot) = artifact.screenshot {
                let _ = writeln!(out, "    screenshot: {}", shot.display());
            }
            let _ = writeln!(out, "    sidecar:    {}", artifact.sidecar.display());
        }
    }
    out
}

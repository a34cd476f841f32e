//! Runs scenarios against a launched browser.
//!
//! Each scenario gets its own [`Session`]. Steps run strictly in order and
//! the first failure stops the scenario; diagnostics are captured once at
//! this boundary and the session is closed on every path.

use crate::cleanup::{cleanup, CleanupOutcome};
use crate::diagnostics::{Diagnostics, FailedStep};
use crate::driver::Launcher;
use crate::report::{RunReport, ScenarioReport, ScenarioStatus, StepRecord};
use crate::result::{ErrorKind, VerifyError, VerifyResult};
use crate::scenario::{Scenario, Step, StepState};
use crate::session::Session;
use crate::wait::{WaitOptions, Waiter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// LISTENER
// =============================================================================

/// Progress callbacks; every method defaults to a no-op
pub trait RunListener: Send + Sync + std::fmt::Debug {
    /// A scenario is about to open its session
    fn scenario_started(&self, _scenario: &Scenario) {}

    /// Step `index` (0-based) is starting
    fn step_started(&self, _scenario: &str, _index: usize, _step: &Step) {}

    /// Step `index` (0-based) passed or failed
    fn step_finished(&self, _scenario: &str, _index: usize, _record: &StepRecord) {}

    /// The cleanup loop returned an outcome
    fn cleanup_finished(&self, _scenario: &str, _outcome: &CleanupOutcome) {}

    /// The scenario is over and its session closed
    fn scenario_finished(&self, _report: &ScenarioReport) {}
}

/// Listener that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl RunListener for NoopListener {}

// =============================================================================
// SETTINGS
// =============================================================================

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Base URL step paths are resolved against
    pub base_url: String,
    /// Default postcondition timeout and poll interval
    pub wait: WaitOptions,
}

impl RunSettings {
    /// Default wait options against `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            wait: WaitOptions::default(),
        }
    }

    /// Set the default wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Drives scenarios through sessions opened by a [`Launcher`]
#[derive(Debug, Clone)]
pub struct Orchestrator {
    launcher: Arc<dyn Launcher>,
    settings: RunSettings,
    waiter: Waiter,
    diagnostics: Diagnostics,
    listener: Arc<dyn RunListener>,
}

impl Orchestrator {
    /// System clock, default diagnostics directory, no listener
    #[must_use]
    pub fn new(launcher: Arc<dyn Launcher>, settings: RunSettings) -> Self {
        Self {
            launcher,
            settings,
            waiter: Waiter::default(),
            diagnostics: Diagnostics::default(),
            listener: Arc::new(NoopListener),
        }
    }

    /// Use `waiter` (and its clock) for polling and settle-waits
    #[must_use]
    pub fn with_waiter(mut self, waiter: Waiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Write artifacts through `diagnostics`
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Report progress to `listener`
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Run settings
    #[must_use]
    pub const fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every scenario in order
    ///
    /// After a browser launch failure the remaining scenarios are reported
    /// as pending instead of launching again.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> RunReport {
        let mut run = RunReport::start(&self.settings.base_url);
        let mut launch_failed = false;
        for scenario in scenarios {
            if launch_failed {
                let names: Vec<String> = scenario.steps.iter().map(|s| s.name.clone()).collect();
                run.scenarios.push(ScenarioReport::new(&scenario.name, &names));
                continue;
            }
            let report = self.run_scenario(scenario).await;
            launch_failed = report.error_kind == Some(ErrorKind::DriverLaunch);
            run.scenarios.push(report);
        }
        run.finish();
        tracing::info!(
            run_id = %run.run_id,
            passed = run.count(ScenarioStatus::Passed),
            failed = run.count(ScenarioStatus::Failed),
            cleanup_failed = run.count(ScenarioStatus::CleanupFailed),
            "run finished"
        );
        run
    }

    /// Run one scenario in a fresh session
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let start = self.waiter.clock().now();
        let names: Vec<String> = scenario.steps.iter().map(|s| s.name.clone()).collect();
        let mut report = ScenarioReport::new(&scenario.name, &names);
        report.status = ScenarioStatus::Running;
        self.listener.scenario_started(scenario);
        tracing::info!(scenario = %scenario.name, steps = names.len(), "scenario started");

        match scenario.validate() {
            Err(e) => fail(&mut report, &e),
            Ok(()) => match Session::open(self.launcher.as_ref(), &self.settings.base_url).await {
                Err(e) => fail(&mut report, &e),
                Ok(mut session) => {
                    self.drive(&session, scenario, &mut report).await;
                    if let Err(e) = session.close().await {
                        tracing::warn!(scenario = %scenario.name, error = %e, "session close failed");
                    }
                }
            },
        }

        report.duration_ms = millis(self.waiter.clock().now().saturating_sub(start));
        match report.status {
            ScenarioStatus::Passed => {
                tracing::info!(scenario = %scenario.name, duration_ms = report.duration_ms, "scenario passed");
            }
            ScenarioStatus::CleanupFailed => {
                tracing::warn!(scenario = %scenario.name, error = ?report.error, "scenario passed but cleanup failed");
            }
            _ => {
                tracing::error!(scenario = %scenario.name, error = ?report.error, "scenario failed");
            }
        }
        self.listener.scenario_finished(&report);
        report
    }

    /// Run only the cleanup loop of `scenario`, after its setup steps
    ///
    /// # Errors
    ///
    /// `Config` if the scenario has no cleanup, `DriverLaunch` if the
    /// browser cannot start, or the first setup/cleanup failure.
    pub async fn run_cleanup_only(&self, scenario: &Scenario) -> VerifyResult<CleanupOutcome> {
        let spec = scenario.cleanup.as_ref().ok_or_else(|| {
            VerifyError::config(format!("scenario '{}' has no cleanup", scenario.name))
        })?;
        spec.validate()?;

        let mut session = Session::open(self.launcher.as_ref(), &self.settings.base_url).await?;
        let outcome = async {
            for step in &spec.setup {
                tracing::info!(scenario = %scenario.name, step = %step.name, "cleanup setup step");
                self.run_step(&session, step).await?;
            }
            cleanup(&session, spec, &self.waiter).await
        }
        .await;
        if let Err(e) = session.close().await {
            tracing::warn!(scenario = %scenario.name, error = %e, "session close failed");
        }
        if let Ok(ref o) = outcome {
            self.listener.cleanup_finished(&scenario.name, o);
        }
        outcome
    }

    async fn drive(&self, session: &Session, scenario: &Scenario, report: &mut ScenarioReport) {
        for (index, step) in scenario.steps.iter().enumerate() {
            self.listener.step_started(&scenario.name, index, step);
            tracing::info!(scenario = %scenario.name, step = index + 1, name = %step.name, "step started");
            report.steps[index].state = StepState::Running;

            let start = self.waiter.clock().now();
            let result = self.run_step(session, step).await;
            let record = &mut report.steps[index];
            record.duration_ms = millis(self.waiter.clock().now().saturating_sub(start));

            match result {
                Ok(checkpoint) => {
                    record.state = StepState::Passed;
                    record.checkpoint = checkpoint;
                    tracing::info!(scenario = %scenario.name, step = index + 1, "step passed");
                    self.listener.step_finished(&scenario.name, index, record);
                }
                Err(e) => {
                    record.state = StepState::Failed;
                    record.error = Some(e.to_string());
                    tracing::error!(scenario = %scenario.name, step = index + 1, error = %e, "step failed");
                    self.listener.step_finished(&scenario.name, index, record);
                    fail(report, &e);
                    if e.wants_diagnostics() {
                        let failed = FailedStep {
                            index: index + 1,
                            name: &step.name,
                        };
                        report.diagnostics = self
                            .diagnostics
                            .capture_failure(session, &scenario.name, Some(failed), &e)
                            .await;
                    }
                    return;
                }
            }
        }

        let Some(ref spec) = scenario.cleanup else {
            report.status = ScenarioStatus::Passed;
            return;
        };
        match cleanup(session, spec, &self.waiter).await {
            Ok(outcome) => {
                self.listener.cleanup_finished(&scenario.name, &outcome);
                report.cleanup = Some(outcome.clone());
                match outcome.into_result(&spec.marker) {
                    Ok(_) => report.status = ScenarioStatus::Passed,
                    Err(e) => cleanup_failed(report, &e),
                }
            }
            Err(e) => cleanup_failed(report, &e),
        }
    }

    /// navigate → act → settle → postcondition → checkpoint
    async fn run_step(&self, session: &Session, step: &Step) -> VerifyResult<Option<PathBuf>> {
        if let Some(ref target) = step.navigate {
            session.navigate(target).await?;
        }
        if let Some(ref action) = step.action {
            session
                .act(action.locator(), &action.to_interaction())
                .await?;
        }
        self.waiter.settle(step.effective_settle()).await;
        if let Some(ref condition) = step.expect {
            let options = self
                .settings
                .wait
                .with_timeout(step.timeout_or(self.settings.wait.timeout));
            self.waiter
                .await_condition(session.driver(), condition, &options)
                .await?;
        }

        let Some(ref name) = step.checkpoint else {
            return Ok(None);
        };
        match self
            .diagnostics
            .capture_checkpoint(session, name, step.full_page)
            .await
        {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                tracing::warn!(checkpoint = %name, error = %e, "checkpoint screenshot failed");
                Ok(None)
            }
        }
    }
}

fn fail(report: &mut ScenarioReport, error: &VerifyError) {
    report.status = ScenarioStatus::Failed;
    report.error_kind = Some(error.kind());
    report.error = Some(error.to_string());
}

fn cleanup_failed(report: &mut ScenarioReport, error: &VerifyError) {
    report.status = ScenarioStatus::CleanupFailed;
    report.error_kind = Some(error.kind());
    report.error = Some(error.to_string());
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

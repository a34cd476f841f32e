//! Run results.

use crate::cleanup::CleanupOutcome;
use crate::diagnostics::DiagnosticArtifact;
use crate::result::ErrorKind;
use crate::scenario::StepState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Not started
    #[default]
    Pending,
    /// In progress
    Running,
    /// Every step passed and cleanup converged (or was not needed)
    Passed,
    /// A step failed or the browser could not start
    Failed,
    /// Every step passed but cleanup left marked artifacts behind
    CleanupFailed,
}

impl ScenarioStatus {
    /// Whether this status counts as a failure
    #[must_use]
    pub const fn is_failure(self, strict_cleanup: bool) -> bool {
        match self {
            Self::Failed => true,
            Self::CleanupFailed => strict_cleanup,
            Self::Pending | Self::Running | Self::Passed => false,
        }
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::CleanupFailed => "CLEANUP FAILED",
        };
        f.write_str(s)
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Final state
    pub state: StepState,
    /// Time spent in the step
    pub duration_ms: u64,
    /// Error message when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Checkpoint screenshot written by this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PathBuf>,
}

impl StepRecord {
    /// A step that never ran
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StepState::Pending,
            duration_ms: 0,
            error: None,
            checkpoint: None,
        }
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Final status
    pub status: ScenarioStatus,
    /// One record per step, in order
    pub steps: Vec<StepRecord>,
    /// Cleanup result, if cleanup ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutcome>,
    /// Classification of the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure (or cleanup warning) message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure evidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticArtifact>,
    /// Wall time
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// A report with every step pending
    #[must_use]
    pub fn new(name: impl Into<String>, step_names: &[String]) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Pending,
            steps: step_names.iter().map(StepRecord::pending).collect(),
            cleanup: None,
            error_kind: None,
            error: None,
            diagnostics: None,
            duration_ms: 0,
        }
    }

    /// Number of steps that passed
    #[must_use]
    pub fn passed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.state == StepState::Passed)
            .count()
    }

    /// The failed step, if any
    #[must_use]
    pub fn failed_step(&self) -> Option<(usize, &StepRecord)> {
        self.steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.state == StepState::Failed)
            .map(|(i, s)| (i + 1, s))
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Base URL under test
    pub base_url: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: DateTime<Utc>,
    /// Scenario reports in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// Start an empty report
    #[must_use]
    pub fn start(base_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            base_url: base_url.into(),
            started_at: now,
            finished_at: now,
            scenarios: Vec::new(),
        }
    }

    /// Stamp the end time
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Count scenarios with `status`
    #[must_use]
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    /// Whether any scenario counts as failed
    #[must_use]
    pub fn has_failures(&self, strict_cleanup: bool) -> bool {
        self.scenarios
            .iter()
            .any(|s| s.status.is_failure(strict_cleanup))
    }

    /// Whether the browser could not be launched for some scenario
    #[must_use]
    pub fn has_launch_failure(&self) -> bool {
        self.scenarios
            .iter()
            .any(|s| s.error_kind == Some(ErrorKind::DriverLaunch))
    }

    /// Process exit code: 0 pass, 1 scenario failure, 2 browser launch failure
    #[must_use]
    pub fn exit_code(&self, strict_cleanup: bool) -> u8 {
        if self.has_launch_failure() {
            2
        } else if self.has_failures(strict_cleanup) {
            1
        } else {
            0
        }
    }
}

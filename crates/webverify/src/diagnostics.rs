//! Failure evidence and checkpoint screenshots.
//!
//! Capture is best-effort: a screenshot that cannot be taken is logged and
//! recorded as missing in the sidecar, and nothing here ever replaces the
//! error that caused the capture.

use crate::result::{ErrorKind, VerifyError};
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default artifact directory
pub const DEFAULT_OUTPUT_DIR: &str = "verification";

/// What happens to artifacts from earlier runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactPolicy {
    /// Fixed names; each run replaces the last
    #[default]
    Overwrite,
    /// Microsecond timestamp suffix; runs accumulate
    Accumulate,
}

/// Evidence written for one failed scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticArtifact {
    /// Scenario name
    pub scenario: String,
    /// 1-based index of the failing step, if a step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    /// Name of the failing step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    /// Error classification
    pub error_kind: ErrorKind,
    /// Error message
    pub error: String,
    /// Page URL at capture time, when it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Capture time
    pub captured_at: DateTime<Utc>,
    /// Screenshot path, if the screenshot succeeded
    pub screenshot: Option<PathBuf>,
    /// Sidecar path
    pub sidecar: PathBuf,
}

/// The failing step, as reported to [`Diagnostics::capture_failure`]
#[derive(Debug, Clone, Copy)]
pub struct FailedStep<'a> {
    /// 1-based index
    pub index: usize,
    /// Step name
    pub name: &'a str,
}

/// Writes artifacts under one directory
#[derive(Debug, Clone)]
pub struct Diagnostics {
    output_dir: PathBuf,
    policy: ArtifactPolicy,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl Diagnostics {
    /// Overwrite artifacts in `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy: ArtifactPolicy::Overwrite,
        }
    }

    /// Set the artifact policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ArtifactPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Artifact directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifact policy
    #[must_use]
    pub const fn policy(&self) -> ArtifactPolicy {
        self.policy
    }

    /// Path for an artifact named `stem` with `extension`
    #[must_use]
    pub fn artifact_path(&self, stem: &str, extension: &str, at: DateTime<Utc>) -> PathBuf {
        let stem = slug(stem);
        let file = match self.policy {
            ArtifactPolicy::Overwrite => format!("{stem}.{extension}"),
            ArtifactPolicy::Accumulate => {
                format!("{stem}_{}.{extension}", at.format("%Y%m%dT%H%M%S%6fZ"))
            }
        };
        self.output_dir.join(file)
    }

    /// Screenshot plus JSON sidecar for a failed scenario
    ///
    /// Returns `None` only if not even the sidecar could be written.
    pub async fn capture_failure(
        &self,
        session: &Session,
        scenario: &str,
        step: Option<FailedStep<'_>>,
        error: &VerifyError,
    ) -> Option<DiagnosticArtifact> {
        let at = Utc::now();
        let stem = format!("error_{scenario}");
        let image = self.artifact_path(&stem, "png", at);
        let sidecar = self.artifact_path(&stem, "json", at);

        let screenshot = match session.screenshot(&image, true).await {
            Ok(()) => Some(image),
            Err(e) => {
                tracing::warn!(%scenario, error = %e, "failure screenshot could not be captured");
                None
            }
        };
        let url = session.current_url().await.ok();

        let artifact = DiagnosticArtifact {
            scenario: scenario.to_string(),
            step_index: step.map(|s| s.index),
            step_name: step.map(|s| s.name.to_string()),
            error_kind: error.kind(),
            error: error.to_string(),
            url,
            captured_at: at,
            screenshot,
            sidecar: sidecar.clone(),
        };

        match write_json(&sidecar, &artifact).await {
            Ok(()) => {
                tracing::info!(%scenario, sidecar = %sidecar.display(), "failure diagnostics written");
                Some(artifact)
            }
            Err(e) => {
                tracing::warn!(%scenario, error = %e, "failure sidecar could not be written");
                None
            }
        }
    }

    /// Named screenshot after a successful step
    pub async fn capture_checkpoint(
        &self,
        session: &Session,
        name: &str,
        full_page: bool,
    ) -> Result<PathBuf, VerifyError> {
        let path = self.artifact_path(name, "png", Utc::now());
        session.screenshot(&path, full_page).await?;
        tracing::info!(checkpoint = %name, path = %path.display(), "checkpoint captured");
        Ok(path)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), VerifyError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    Ok(())
}

/// File-name-safe form of a scenario or checkpoint name
fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

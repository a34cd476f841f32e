//! Run configuration file (`webverify.yaml`).

use crate::browser::BrowserSettings;
use crate::diagnostics::{ArtifactPolicy, Diagnostics, DEFAULT_OUTPUT_DIR};
use crate::result::{VerifyError, VerifyResult};
use crate::scenarios::ScenarioParams;
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "webverify.yaml";

/// Default deployment under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Postcondition defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Timeout for steps without their own
    pub timeout_ms: u64,
    /// Pause between evaluations
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Where artifacts go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Artifact directory
    pub output_dir: PathBuf,
    /// Overwrite or accumulate
    pub policy: ArtifactPolicy,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            policy: ArtifactPolicy::Overwrite,
        }
    }
}

/// Everything a run needs besides the scenarios themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Deployment under test
    pub base_url: String,
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Wait defaults
    pub wait: WaitConfig,
    /// Artifact settings
    pub diagnostics: DiagnosticsConfig,
    /// Inputs for the built-in scenarios
    pub params: ScenarioParams,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserSettings::default(),
            wait: WaitConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            params: ScenarioParams::default(),
        }
    }
}

impl VerifyConfig {
    /// Parse YAML; missing keys take their defaults
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| VerifyError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`
    pub fn load(path: &Path) -> VerifyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text).map_err(|e| match e {
            VerifyError::Config { message } => {
                VerifyError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Load `path` if given, else `webverify.yaml` if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> VerifyResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!(path = DEFAULT_CONFIG_FILE, "using configuration file");
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> VerifyResult<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| VerifyError::config(format!("cannot serialize configuration: {e}")))
    }

    /// Reject values no run could use
    pub fn validate(&self) -> VerifyResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(VerifyError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.wait.timeout_ms == 0 {
            return Err(VerifyError::config("wait.timeout_ms must be greater than zero"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(VerifyError::config(
                "wait.poll_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Default wait options for steps
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(self.wait.timeout_ms),
            poll_interval: Duration::from_millis(self.wait.poll_interval_ms),
        }
    }

    /// Artifact writer for this configuration
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(&self.diagnostics.output_dir).with_policy(self.diagnostics.policy)
    }
}

//! Error types for the CLI

use thiserror::Error;
use webverify::VerifyError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Scenario name not among the built-ins
    #[error("Unknown scenario '{name}' (see `webverify list`)")]
    UnknownScenario {
        /// Requested name
        name: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON report serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Library error
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code: 2 for setup problems, 1 for everything else
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config { .. } | Self::InvalidArgument { .. } | Self::UnknownScenario { .. } => 2,
            Self::Verify(
                VerifyError::Config { .. }
                | VerifyError::ScenarioParse { .. }
                | VerifyError::DriverLaunch { .. },
            ) => 2,
            Self::Verify(_) | Self::Io(_) | Self::Json(_) => 1,
        }
    }
}

//! JavaScript dialog handling (alert, confirm, prompt, beforeunload).
//!
//! Dialogs block the action that spawned them, so a handler has to be armed
//! before that action fires. Arming is idempotent: once armed, every dialog
//! of the session is answered according to the policy.

use serde::{Deserialize, Serialize};

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl DialogType {
    /// Parse the CDP dialog type name
    #[must_use]
    pub fn from_cdp(name: &str) -> Self {
        match name {
            "confirm" => Self::Confirm,
            "prompt" => Self::Prompt,
            "beforeunload" => Self::BeforeUnload,
            _ => Self::Alert,
        }
    }
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// How armed dialogs are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPolicy {
    /// Accept every dialog (OK/Yes/Leave)
    #[default]
    AcceptAll,
    /// Dismiss every dialog (Cancel/No/Stay)
    DismissAll,
}

impl DialogPolicy {
    /// Whether dialogs are accepted
    #[must_use]
    pub const fn accepts(self) -> bool {
        matches!(self, Self::AcceptAll)
    }
}

/// A dialog that was answered by an armed handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandledDialog {
    /// Type of dialog
    pub dialog_type: DialogType,
    /// Message displayed in the dialog
    pub message: String,
    /// Whether it was accepted
    pub accepted: bool,
}

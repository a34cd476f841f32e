//! Driver abstraction for browser automation.
//!
//! [`Driver`] is the seam between the orchestrator and a concrete browser:
//! `ChromiumDriver` talks CDP through chromiumoxide, [`crate::MockDriver`]
//! keeps an in-memory page for the harness's own tests.
//!
//! Resolution, interaction, and waiting are separate on purpose:
//! [`Driver::probe`] resolves a locator without waiting and reports "not
//! found" as data, [`Driver::act`] fires exactly once, and retrying is left
//! to [`crate::Waiter`].

use crate::dialog::DialogPolicy;
use crate::locator::Locator;
use crate::result::VerifyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// State of the element a locator picked
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PickedElement {
    /// Rendered with a non-empty box and not `visibility: hidden`
    pub visible: bool,
    /// Whitespace-normalized text content
    pub text: String,
}

/// Snapshot of a locator's resolution at one instant
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Number of matching elements
    pub count: usize,
    /// The element selected by the locator's pick, if it exists
    pub picked: Option<PickedElement>,
}

impl ElementState {
    /// Nothing matched
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            count: 0,
            picked: None,
        }
    }

    /// Whether the picked element exists
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.picked.is_some()
    }

    /// Whether the picked element exists and is visible
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.picked.as_ref().is_some_and(|el| el.visible)
    }
}

/// A single user interaction with an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    /// Replace the field's value
    Fill(String),
    /// Click the element's center
    Click,
    /// Choose an `<option>` by value or label
    Select(String),
    /// Set files on an `<input type="file">`
    Upload(PathBuf),
}

impl Interaction {
    /// Short verb for logs
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Fill(_) => "fill",
            Self::Click => "click",
            Self::Select(_) => "select",
            Self::Upload(_) => "upload",
        }
    }
}

/// Abstract browser page
///
/// Implementations own one browser, one context and one page.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Load `url` and wait for the load event
    ///
    /// Fails with `Navigation` on network errors or a detectable error status.
    async fn navigate(&self, url: &str) -> VerifyResult<()>;

    /// Current page URL
    async fn current_url(&self) -> VerifyResult<String>;

    /// Resolve `locator` against the current page without waiting
    async fn probe(&self, locator: &Locator) -> VerifyResult<ElementState>;

    /// Perform `interaction` on the element `locator` picks
    ///
    /// Fails with `Interaction` if the element is missing, hidden, disabled,
    /// or covered at the instant of the call. Never retries.
    async fn act(&self, locator: &Locator, interaction: &Interaction) -> VerifyResult<()>;

    /// Answer every subsequent JavaScript dialog according to `policy`
    ///
    /// Must be called before the action that opens the dialog. Idempotent.
    async fn arm_dialogs(&self, policy: DialogPolicy) -> VerifyResult<()>;

    /// Capture a PNG of the viewport or the full page
    async fn screenshot(&self, full_page: bool) -> VerifyResult<Vec<u8>>;

    /// Close the page and the browser
    async fn close(&self) -> VerifyResult<()>;
}

/// Opens a fresh [`Driver`] for each scenario run
#[async_trait]
pub trait Launcher: Send + Sync + std::fmt::Debug {
    /// Start a browser with one page
    ///
    /// Fails with `DriverLaunch` if the browser process cannot start.
    async fn launch(&self) -> VerifyResult<Box<dyn Driver>>;
}

//! One browser session per scenario run.
//!
//! A [`Session`] owns its driver exclusively and is closed exactly once by
//! whoever opened it. Dropping an unclosed session only logs; the concrete
//! driver's own drop path releases the browser process.

use crate::driver::{Driver, ElementState, Interaction, Launcher};
use crate::locator::Locator;
use crate::result::VerifyResult;
use std::path::Path;

/// A launched browser bound to a base URL
#[derive(Debug)]
pub struct Session {
    driver: Box<dyn Driver>,
    base_url: String,
    closed: bool,
}

impl Session {
    /// Launch a browser and bind it to `base_url`
    ///
    /// # Errors
    ///
    /// Returns `DriverLaunch` if the browser cannot start.
    pub async fn open(launcher: &dyn Launcher, base_url: &str) -> VerifyResult<Self> {
        let driver = launcher.launch().await?;
        Ok(Self::new(driver, base_url))
    }

    /// Wrap an already launched driver
    #[must_use]
    pub fn new(driver: Box<dyn Driver>, base_url: &str) -> Self {
        Self {
            driver,
            base_url: base_url.trim_end_matches('/').to_string(),
            closed: false,
        }
    }

    /// Base URL paths are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Join `target` onto the base URL unless it is already absolute
    #[must_use]
    pub fn resolve_url(&self, target: &str) -> String {
        if target.contains("://") || target.starts_with("data:") || target.starts_with("about:") {
            return target.to_string();
        }
        let path = target.trim_start_matches('/');
        if path.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Navigate to a path or absolute URL
    pub async fn navigate(&self, target: &str) -> VerifyResult<()> {
        let url = self.resolve_url(target);
        tracing::debug!(%url, "navigate");
        self.driver.navigate(&url).await
    }

    /// Current page URL
    pub async fn current_url(&self) -> VerifyResult<String> {
        self.driver.current_url().await
    }

    /// Bind a locator to this session without resolving it
    #[must_use]
    pub fn locate(&self, locator: Locator) -> LocatorHandle<'_> {
        LocatorHandle {
            session: self,
            locator,
        }
    }

    /// Perform one interaction (no retries)
    pub async fn act(&self, locator: &Locator, interaction: &Interaction) -> VerifyResult<()> {
        self.driver.act(locator, interaction).await
    }

    /// Capture a PNG to `path`, creating parent directories
    pub async fn screenshot(&self, path: &Path, full_page: bool) -> VerifyResult<()> {
        let png = self.driver.screenshot(full_page).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        tracing::debug!(path = %path.display(), full_page, "screenshot saved");
        Ok(())
    }

    /// Whether `close` has run
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the browser; later calls are no-ops
    pub async fn close(&mut self) -> VerifyResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(base_url = %self.base_url, "session dropped without close");
        }
    }
}

/// A locator bound to a live session; resolved on every call
#[derive(Debug)]
pub struct LocatorHandle<'a> {
    session: &'a Session,
    locator: Locator,
}

impl LocatorHandle<'_> {
    /// The bound locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Current resolution
    pub async fn state(&self) -> VerifyResult<ElementState> {
        self.session.driver.probe(&self.locator).await
    }

    /// Whether the picked element is visible right now
    pub async fn is_visible(&self) -> VerifyResult<bool> {
        Ok(self.state().await?.is_visible())
    }

    /// Number of matches right now
    pub async fn count(&self) -> VerifyResult<usize> {
        Ok(self.state().await?.count)
    }
}

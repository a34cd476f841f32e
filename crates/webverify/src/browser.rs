//! Chromium control over the Chrome `DevTools` Protocol.
//!
//! [`BrowserSettings`] is always available so configuration can be parsed
//! without the `browser` feature; the CDP-backed [`ChromiumLauncher`] and
//! [`ChromiumDriver`] require it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// How long to wait for the browser to come up
    pub launch_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            launch_timeout_ms: 20_000,
        }
    }
}

impl BrowserSettings {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Launch timeout as a duration
    #[must_use]
    pub const fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumLauncher};

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserSettings;
    use crate::dialog::{DialogPolicy, DialogType};
    use crate::driver::{Driver, ElementState, Interaction, Launcher};
    use crate::locator::{js_str, Locator, JS_PRELUDE};
    use crate::result::{VerifyError, VerifyResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::{watch, Mutex};
    use tokio::task::JoinHandle;

    /// Attribute used to hand a JS-resolved element over to CDP input commands
    const TARGET_ATTR: &str = "data-webverify-target";

    /// Re-evaluations of a state query whose execution context went away
    const CONTEXT_RETRIES: u32 = 3;

    /// Pause before re-evaluating in a fresh execution context
    const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

    /// Evaluation failures caused by the page being replaced mid-call
    const CONTEXT_LOST: &[&str] = &[
        "Execution context was destroyed",
        "Cannot find context with specified id",
        "Cannot find default execution context",
    ];

    /// The evaluation failed because a navigation tore down its context
    pub(super) fn is_context_lost(message: &str) -> bool {
        CONTEXT_LOST.iter().any(|m| message.contains(m))
    }

    /// Launches a fresh Chromium per scenario run
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumLauncher {
        settings: BrowserSettings,
    }

    impl ChromiumLauncher {
        /// Create a launcher
        #[must_use]
        pub const fn new(settings: BrowserSettings) -> Self {
            Self { settings }
        }

        /// Launch settings
        #[must_use]
        pub const fn settings(&self) -> &BrowserSettings {
            &self.settings
        }
    }

    #[async_trait]
    impl Launcher for ChromiumLauncher {
        async fn launch(&self) -> VerifyResult<Box<dyn Driver>> {
            Ok(Box::new(ChromiumDriver::launch(&self.settings).await?))
        }
    }

    /// One Chromium process with one page
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: Mutex<Option<Browser>>,
        page: Page,
        handler: JoinHandle<()>,
        dialogs: Mutex<Option<JoinHandle<()>>>,
        dialog_policy: watch::Sender<DialogPolicy>,
    }

    impl ChromiumDriver {
        /// Start Chromium and open a blank page
        ///
        /// # Errors
        ///
        /// Returns `DriverLaunch` if the process cannot start or the page
        /// cannot be created.
        pub async fn launch(settings: &BrowserSettings) -> VerifyResult<Self> {
            let mut builder = BrowserConfig::builder()
                .window_size(settings.viewport_width, settings.viewport_height)
                .launch_timeout(settings.launch_timeout());
            if !settings.headless {
                builder = builder.with_head();
            }
            if !settings.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = settings.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let config = builder.build().map_err(VerifyError::launch)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| VerifyError::launch(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    handler.abort();
                    return Err(VerifyError::launch(format!("cannot open page: {e}")));
                }
            };
            tracing::info!(headless = settings.headless, "browser launched");

            Ok(Self {
                browser: Mutex::new(Some(browser)),
                page,
                handler,
                dialogs: Mutex::new(None),
                dialog_policy: watch::channel(DialogPolicy::default()).0,
            })
        }

        async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, String> {
            self.page
                .evaluate(script)
                .await
                .map_err(|e| e.to_string())?
                .into_value::<T>()
                .map_err(|e| e.to_string())
        }

        /// Run a check-and-act script; `null` means success, a string is the failure
        async fn act_script(&self, locator: &Locator, body: &str) -> VerifyResult<()> {
            let script = format!(
                "(() => {{ {JS_PRELUDE} const el = {picked}; \
                 if (!el) return 'no element matches'; \
                 if (!__wv_visible(el)) return 'element is not visible'; \
                 if (el.disabled) return 'element is disabled'; \
                 {body} return null; }})()",
                picked = locator.to_js_picked(),
            );
            let outcome: Option<String> = self
                .eval(script)
                .await
                .map_err(|e| VerifyError::interaction(locator.description(), e))?;
            match outcome {
                None => Ok(()),
                Some(message) => Err(VerifyError::interaction(locator.description(), message)),
            }
        }

        async fn tagged_element(&self, locator: &Locator) -> VerifyResult<chromiumoxide::element::Element> {
            self.page
                .find_element(format!("[{TARGET_ATTR}]"))
                .await
                .map_err(|e| VerifyError::interaction(locator.description(), e.to_string()))
        }
    }

    fn tag_script() -> String {
        format!(
            "document.querySelectorAll('[{TARGET_ATTR}]').forEach(e => e.removeAttribute('{TARGET_ATTR}')); \
             el.setAttribute('{TARGET_ATTR}', '1');"
        )
    }

    #[async_trait]
    impl Driver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> VerifyResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| VerifyError::navigation(url, e.to_string()))?;
            let status: u16 = self
                .eval(
                    "(() => { const e = performance.getEntriesByType('navigation')[0]; \
                     return e && e.responseStatus ? e.responseStatus : 0; })()"
                        .to_string(),
                )
                .await
                .unwrap_or(0);
            if status >= 400 {
                return Err(VerifyError::navigation(
                    url,
                    format!("server responded with status {status}"),
                ));
            }
            tracing::debug!(%url, status, "navigated");
            Ok(())
        }

        async fn current_url(&self) -> VerifyResult<String> {
            let url = self
                .page
                .url()
                .await
                .map_err(|e| VerifyError::navigation("<current>", e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn probe(&self, locator: &Locator) -> VerifyResult<ElementState> {
            let mut attempt = 0;
            loop {
                match self.eval::<ElementState>(locator.to_probe_script()).await {
                    Ok(state) => return Ok(state),
                    // Contexts die mid-navigation; re-evaluate once the new page has one
                    Err(e) if is_context_lost(&e) && attempt < CONTEXT_RETRIES => {
                        attempt += 1;
                        tracing::debug!(locator = %locator.description(), attempt, error = %e, "context lost, re-evaluating");
                        tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    }
                    Err(e) => {
                        tracing::warn!(locator = %locator.description(), error = %e, "element state unavailable");
                        return Err(VerifyError::navigation(
                            "<current>",
                            format!("cannot read state of {}: {e}", locator.description()),
                        ));
                    }
                }
            }
        }

        async fn act(&self, locator: &Locator, interaction: &Interaction) -> VerifyResult<()> {
            tracing::debug!(locator = %locator.description(), verb = interaction.verb(), "act");
            match interaction {
                Interaction::Fill(value) => {
                    let body = format!(
                        "if (!('value' in el)) return 'element is not fillable'; \
                         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
                         el.focus(); \
                         Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {v}); \
                         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                         el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
                        v = js_str(value)
                    );
                    self.act_script(locator, &body).await
                }
                Interaction::Select(value) => {
                    let body = format!(
                        "if (el.tagName !== 'SELECT') return 'element is not a select'; \
                         const opt = Array.from(el.options).find(o => o.value === {v} || __wv_text(o) === {v}); \
                         if (!opt) return 'no option ' + {v}; \
                         Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set.call(el, opt.value); \
                         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                         el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
                        v = js_str(value)
                    );
                    self.act_script(locator, &body).await
                }
                Interaction::Click => {
                    let body = format!(
                        "el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
                         const r = el.getBoundingClientRect(); \
                         const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
                         if (top && top !== el && !el.contains(top) && !top.contains(el)) \
                           return 'element is covered by <' + top.tagName.toLowerCase() + '>'; \
                         {tag}",
                        tag = tag_script()
                    );
                    self.act_script(locator, &body).await?;
                    self.tagged_element(locator)
                        .await?
                        .click()
                        .await
                        .map_err(|e| VerifyError::interaction(locator.description(), e.to_string()))?;
                    Ok(())
                }
                Interaction::Upload(path) => {
                    let body = format!(
                        "if (el.tagName !== 'INPUT' || el.type !== 'file') return 'not a file input'; {tag}",
                        tag = tag_script()
                    );
                    // File inputs are often visually hidden behind a styled label
                    let script = format!(
                        "(() => {{ {JS_PRELUDE} const el = {picked}; \
                         if (!el) return 'no element matches'; \
                         if (el.disabled) return 'element is disabled'; \
                         {body} return null; }})()",
                        picked = locator.to_js_picked(),
                    );
                    let outcome: Option<String> = self
                        .eval(script)
                        .await
                        .map_err(|e| VerifyError::interaction(locator.description(), e))?;
                    if let Some(message) = outcome {
                        return Err(VerifyError::interaction(locator.description(), message));
                    }
                    let absolute = std::fs::canonicalize(path).map_err(|e| {
                        VerifyError::interaction(
                            locator.description(),
                            format!("cannot read {}: {e}", path.display()),
                        )
                    })?;
                    let element = self.tagged_element(locator).await?;
                    let params = SetFileInputFilesParams::builder()
                        .files(vec![absolute.display().to_string()])
                        .backend_node_id(element.backend_node_id)
                        .build()
                        .map_err(|e| VerifyError::interaction(locator.description(), e))?;
                    self.page
                        .execute(params)
                        .await
                        .map_err(|e| VerifyError::interaction(locator.description(), e.to_string()))?;
                    Ok(())
                }
            }
        }

        async fn arm_dialogs(&self, policy: DialogPolicy) -> VerifyResult<()> {
            let previous = self.dialog_policy.send_replace(policy);
            let mut slot = self.dialogs.lock().await;
            if slot.is_some() {
                if previous != policy {
                    tracing::debug!(accept = policy.accepts(), "dialog policy changed");
                }
                return Ok(());
            }
            let mut events = self
                .page
                .event_listener::<EventJavascriptDialogOpening>()
                .await
                .map_err(|e| VerifyError::interaction("dialog handler", e.to_string()))?;
            let page = self.page.clone();
            let current = self.dialog_policy.subscribe();
            *slot = Some(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let policy = *current.borrow();
                    let dialog_type =
                        DialogType::from_cdp(&format!("{:?}", event.r#type).to_lowercase());
                    tracing::info!(%dialog_type, message = %event.message, accept = policy.accepts(), "dialog");
                    if let Err(e) = page
                        .execute(HandleJavaScriptDialogParams::new(policy.accepts()))
                        .await
                    {
                        tracing::warn!(error = %e, "failed to answer dialog");
                    }
                }
            }));
            Ok(())
        }

        async fn screenshot(&self, full_page: bool) -> VerifyResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(full_page)
                .build();
            self.page
                .screenshot(params)
                .await
                .map_err(|e| VerifyError::screenshot(e.to_string()))
        }

        async fn close(&self) -> VerifyResult<()> {
            if let Some(task) = self.dialogs.lock().await.take() {
                task.abort();
            }
            let Some(mut browser) = self.browser.lock().await.take() else {
                return Ok(());
            };
            let closed = browser
                .close()
                .await
                .map_err(|e| VerifyError::launch(format!("close failed: {e}")));
            if closed.is_ok() {
                let _ = browser.wait().await;
            }
            self.handler.abort();
            tracing::debug!("browser closed");
            closed.map(|_| ())
        }
    }

    impl Drop for ChromiumDriver {
        fn drop(&mut self) {
            // Dropping the Browser kills the child process
            self.handler.abort();
            if let Ok(mut slot) = self.dialogs.try_lock() {
                if let Some(task) = slot.take() {
                    task.abort();
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let s = BrowserSettings::default();
        assert!(s.headless);
        assert!(s.sandbox);
        assert_eq!(s.launch_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_settings_builders() {
        let s = BrowserSettings::default()
            .with_headless(false)
            .with_viewport(1920, 1080)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert!(!s.headless);
        assert_eq!((s.viewport_width, s.viewport_height), (1920, 1080));
        assert_eq!(s.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!s.sandbox);
    }

    #[test]
    fn test_settings_partial_yaml() {
        let s: BrowserSettings = serde_yaml_ng::from_str("headless: false\n").unwrap();
        assert!(!s.headless);
        assert_eq!(s.viewport_width, 1280);
    }

    #[cfg(feature = "browser")]
    #[test]
    fn test_only_lost_contexts_are_retried() {
        assert!(cdp::is_context_lost(
            "Execution context was destroyed, most likely because of a navigation."
        ));
        assert!(cdp::is_context_lost("Cannot find context with specified id"));
        assert!(!cdp::is_context_lost("Target closed"));
        assert!(!cdp::is_context_lost("Invalid selector: ##"));
        assert!(!cdp::is_context_lost("Request timed out."));
    }

    #[cfg(feature = "browser")]
    #[tokio::test]
    #[ignore = "requires a local Chromium"]
    async fn test_chromium_launch_and_probe() {
        use crate::driver::{Driver, Launcher};
        use crate::locator::Locator;

        let launcher = ChromiumLauncher::new(BrowserSettings::default().with_no_sandbox());
        let driver = launcher.launch().await.unwrap();
        driver
            .navigate("data:text/html,<h1>Verification Tour</h1>")
            .await
            .unwrap();
        let state = driver.probe(&Locator::css("h1")).await.unwrap();
        assert!(state.is_visible());
        assert_eq!(state.picked.unwrap().text, "Verification Tour");
        driver.close().await.unwrap();
    }
}

//! Declarative element locators.
//!
//! A [`Locator`] never holds a reference to a live element. It describes how
//! to find one (by CSS, visible text, accessible label, placeholder, or test
//! id, optionally filtered by contained text and scoped inside a parent
//! locator) and is re-resolved against the page every time it is probed.
//!
//! ```
//! use webverify::Locator;
//!
//! let delete = Locator::css("tr")
//!     .with_text("Verification Tour")
//!     .locator(Locator::css("button"));
//! assert_eq!(
//!     delete.description(),
//!     "css \"button\" within css \"tr\" with text \"Verification Tour\""
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Strategy for matching elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., `input[name="title"]`)
    Css(String),
    /// Innermost elements whose text contains the string
    Text(String),
    /// Elements labelled by `aria-label` or an associated `<label>`
    Label(String),
    /// Inputs with the exact placeholder
    Placeholder(String),
    /// `data-testid` attribute
    TestId(String),
}

impl Selector {
    /// Human-readable form used in error messages
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Css(s) => format!("css {s:?}"),
            Self::Text(t) => format!("text {t:?}"),
            Self::Label(l) => format!("label {l:?}"),
            Self::Placeholder(p) => format!("placeholder {p:?}"),
            Self::TestId(id) => format!("test id {id:?}"),
        }
    }

    /// JavaScript expression returning an array of matches under `scope`
    ///
    /// Relies on the helpers defined in [`JS_PRELUDE`].
    #[must_use]
    pub fn to_query_all(&self, scope: &str) -> String {
        match self {
            Self::Css(s) => format!("Array.from({scope}.querySelectorAll({}))", js_str(s)),
            Self::Text(t) => format!("__wv_by_text({scope}, {})", js_str(t)),
            Self::Label(l) => format!("__wv_by_label({scope}, {})", js_str(l)),
            Self::Placeholder(p) => format!(
                "Array.from({scope}.querySelectorAll('[placeholder]')).filter(el => el.getAttribute('placeholder') === {})",
                js_str(p)
            ),
            Self::TestId(id) => format!(
                "Array.from({scope}.querySelectorAll('[data-testid]')).filter(el => el.getAttribute('data-testid') === {})",
                js_str(id)
            ),
        }
    }
}

/// Which of several matches a locator refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// First match in document order
    #[default]
    First,
    /// Last match in document order
    Last,
    /// Zero-based index
    Nth(usize),
}

impl Pick {
    /// Resolve against a match count
    #[must_use]
    pub const fn index(self, count: usize) -> Option<usize> {
        match self {
            Self::First if count > 0 => Some(0),
            Self::Last if count > 0 => Some(count - 1),
            Self::Nth(n) if n < count => Some(n),
            _ => None,
        }
    }

    const fn is_first(&self) -> bool {
        matches!(self, Self::First)
    }
}

/// A declarative description of page elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Base selector
    #[serde(flatten)]
    pub selector: Selector,
    /// Keep only matches whose text contains this string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_text: Option<String>,
    /// Search only inside the element picked by this locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Box<Locator>>,
    /// Which match the locator refers to
    #[serde(default, skip_serializing_if = "Pick::is_first")]
    pub pick: Pick,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            has_text: None,
            within: None,
            pick: Pick::First,
        }
    }

    /// CSS selector locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Visible text locator
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text(text.into()))
    }

    /// Accessible label locator
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label(label.into()))
    }

    /// Placeholder locator
    #[must_use]
    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self::from_selector(Selector::Placeholder(placeholder.into()))
    }

    /// `data-testid` locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId(id.into()))
    }

    /// Filter by contained text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    /// Scope this locator inside `parent`
    #[must_use]
    pub fn within(mut self, parent: Self) -> Self {
        self.within = Some(Box::new(parent));
        self
    }

    /// Locate `child` inside the element this locator picks
    #[must_use]
    pub fn locator(&self, child: Self) -> Self {
        child.within(self.clone())
    }

    /// Refer to the first match
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.pick = Pick::First;
        self
    }

    /// Refer to the last match
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.pick = Pick::Last;
        self
    }

    /// Refer to the n-th match (zero-based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.pick = Pick::Nth(index);
        self
    }

    /// Human-readable description for logs and timeouts
    #[must_use]
    pub fn description(&self) -> String {
        let mut out = self.selector.description();
        if let Some(ref text) = self.has_text {
            out.push_str(&format!(" with text {text:?}"));
        }
        match self.pick {
            Pick::First => {}
            Pick::Last => out.push_str(" (last)"),
            Pick::Nth(n) => out.push_str(&format!(" (nth {n})")),
        }
        if let Some(ref parent) = self.within {
            out.push_str(" within ");
            out.push_str(&parent.description());
        }
        out
    }

    /// JavaScript expression evaluating to the array of all matches
    #[must_use]
    pub fn to_js_matches(&self) -> String {
        let scopes = self.within.as_ref().map_or_else(
            || "[document]".to_string(),
            |parent| format!("((p) => p ? [p] : [])({})", parent.to_js_picked()),
        );
        let query = self.selector.to_query_all("s");
        let filter = self.has_text.as_ref().map_or_else(String::new, |text| {
            format!(".filter(el => __wv_text(el).includes({}))", js_str(text))
        });
        format!("{scopes}.flatMap(s => {query}){filter}")
    }

    /// JavaScript expression evaluating to the picked element or `null`
    #[must_use]
    pub fn to_js_picked(&self) -> String {
        format!(
            "((m) => m[{}] ?? null)({})",
            self.js_index(),
            self.to_js_matches()
        )
    }

    /// Script returning `{count, picked: {visible, text} | null}` as JSON
    #[must_use]
    pub fn to_probe_script(&self) -> String {
        format!(
            "(() => {{ {JS_PRELUDE} const m = {matches}; const el = m[{index}] ?? null; \
             return {{ count: m.length, picked: el ? {{ visible: __wv_visible(el), text: __wv_text(el) }} : null }}; }})()",
            matches = self.to_js_matches(),
            index = self.js_index(),
        )
    }

    fn js_index(&self) -> String {
        match self.pick {
            Pick::First => "0".to_string(),
            Pick::Last => "m.length - 1".to_string(),
            Pick::Nth(n) => n.to_string(),
        }
    }
}

/// Helpers shared by every generated script
pub const JS_PRELUDE: &str = "\
const __wv_text = (el) => (el.innerText ?? el.textContent ?? '').replace(/\\s+/g, ' ').trim(); \
const __wv_visible = (el) => { if (!el || !el.isConnected) return false; \
  const st = getComputedStyle(el); if (st.visibility === 'hidden' || st.display === 'none') return false; \
  const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }; \
const __wv_by_text = (scope, t) => Array.from(scope.querySelectorAll('body *')) \
  .filter(el => !['SCRIPT', 'STYLE', 'NOSCRIPT'].includes(el.tagName)) \
  .filter(el => (el.textContent ?? '').includes(t)) \
  .filter(el => !Array.from(el.children).some(c => (c.textContent ?? '').includes(t))); \
const __wv_by_label = (scope, l) => { \
  const direct = Array.from(scope.querySelectorAll('[aria-label]')).filter(el => el.getAttribute('aria-label') === l); \
  const viaLabel = Array.from(scope.querySelectorAll('label')).filter(lb => __wv_text(lb) === l).map(lb => lb.control).filter(Boolean); \
  return [...new Set([...direct, ...viaLabel])]; };";

/// Quote a string as a JavaScript literal
#[must_use]
pub fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

//! In-memory driver for testing the harness without a browser.
//!
//! [`MockDriver`] keeps a tiny element tree per page, resolves [`Locator`]s
//! against it with the same rules the browser-side scripts use, and lets a
//! test describe the application under test as routes (page builders), a
//! key/value store (the "server"), and click reactions.
//!
//! It is deliberately small: CSS support covers tags, ids, classes,
//! attribute tests (`=`, `*=`, `^=`, `$=`, presence) and descendant chains.
//! Anything else matches nothing.

use crate::clock::{Clock, ManualClock};
use crate::dialog::{DialogPolicy, DialogType, HandledDialog};
use crate::driver::{Driver, ElementState, Interaction, Launcher, PickedElement};
use crate::locator::{Locator, Selector};
use crate::result::{VerifyError, VerifyResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Index of a node in a [`MockDom`]
pub type NodeId = usize;

/// Backend data shared across page renders, keyed by collection name
pub type MockStore = BTreeMap<String, Vec<String>>;

type RouteFn = Arc<dyn Fn(&mut MockDom, &MockStore) + Send + Sync>;
type EffectFn = Arc<dyn Fn(&mut MockDom, &mut MockStore, NodeId) + Send + Sync>;

// =============================================================================
// DOM
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    hidden: bool,
    visible_from: Option<Duration>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A rendered page
#[derive(Debug, Clone)]
pub struct MockDom {
    nodes: Vec<Node>,
    now: Duration,
    redirect: Option<String>,
}

impl Default for MockDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDom {
    /// Empty page with a `body` root
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".into(),
                ..Node::default()
            }],
            now: Duration::ZERO,
            redirect: None,
        }
    }

    /// The `body` element
    #[must_use]
    pub const fn root(&self) -> NodeId {
        0
    }

    /// Append a child element
    pub fn add(&mut self, parent: NodeId, tag: &str) -> NodeBuilder<'_> {
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent),
            ..Node::default()
        });
        self.nodes[parent].children.push(id);
        NodeBuilder { dom: self, id }
    }

    /// Detach a node (and its subtree) from the page
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    /// Show or hide a node
    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        self.nodes[node].hidden = hidden;
    }

    /// Set the text of a node
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node].text = text.to_string();
    }

    /// Ask the driver to navigate to `path` once the current reaction ends
    pub fn redirect(&mut self, path: &str) {
        self.redirect = Some(path.to_string());
    }

    /// Parent of a node (`None` for the root or detached nodes)
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    /// Nearest ancestor-or-self with `tag`
    #[must_use]
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.nodes[id].tag == tag {
                return Some(id);
            }
            current = self.nodes[id].parent;
        }
        None
    }

    /// Current value of the element `locator` picks
    #[must_use]
    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.pick(locator).map(|id| self.nodes[id].value.clone())
    }

    /// Current value of a node
    #[must_use]
    pub fn value(&self, node: NodeId) -> &str {
        &self.nodes[node].value
    }

    /// Whitespace-normalized text of a node and its descendants
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut parts = vec![self.nodes[node].text.clone()];
        for &child in &self.nodes[node].children {
            parts.push(self.text_content(child));
        }
        normalize(&parts.join(" "))
    }

    /// Whether the node is attached and rendered at the current time
    #[must_use]
    pub fn is_visible(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id];
            if n.hidden || n.visible_from.is_some_and(|t| self.now < t) {
                return false;
            }
            if id == self.root() {
                return true;
            }
            current = n.parent;
        }
        false
    }

    /// All matches of `locator` in document order
    #[must_use]
    pub fn query(&self, locator: &Locator) -> Vec<NodeId> {
        let scope = match locator.within {
            Some(ref parent) => match self.pick(parent) {
                Some(id) => id,
                None => return Vec::new(),
            },
            None => self.root(),
        };
        let candidates = self.descendants(scope);
        let mut matches: Vec<NodeId> = match locator.selector {
            Selector::Css(ref css) => match parse_css(css) {
                Some(chain) => candidates
                    .into_iter()
                    .filter(|&id| self.matches_chain(id, &chain))
                    .collect(),
                None => Vec::new(),
            },
            Selector::Text(ref t) => candidates
                .into_iter()
                .filter(|&id| self.text_content(id).contains(t.as_str()))
                .filter(|&id| {
                    !self.nodes[id]
                        .children
                        .iter()
                        .any(|&c| self.text_content(c).contains(t.as_str()))
                })
                .collect(),
            Selector::Label(ref l) => {
                let for_ids: Vec<String> = candidates
                    .iter()
                    .filter(|&&id| self.nodes[id].tag == "label" && self.text_content(id) == *l)
                    .filter_map(|&id| self.attr(id, "for").map(str::to_string))
                    .collect();
                candidates
                    .into_iter()
                    .filter(|&id| {
                        self.attr(id, "aria-label") == Some(l.as_str())
                            || self.attr(id, "id").is_some_and(|v| for_ids.iter().any(|f| f == v))
                    })
                    .collect()
            }
            Selector::Placeholder(ref p) => candidates
                .into_iter()
                .filter(|&id| self.attr(id, "placeholder") == Some(p.as_str()))
                .collect(),
            Selector::TestId(ref t) => candidates
                .into_iter()
                .filter(|&id| self.attr(id, "data-testid") == Some(t.as_str()))
                .collect(),
        };
        if let Some(ref text) = locator.has_text {
            matches.retain(|&id| self.text_content(id).contains(text.as_str()));
        }
        matches
    }

    /// The element `locator` picks
    #[must_use]
    pub fn pick(&self, locator: &Locator) -> Option<NodeId> {
        let matches = self.query(locator);
        locator.pick.index(matches.len()).map(|i| matches[i])
    }

    fn state(&self, locator: &Locator) -> ElementState {
        let matches = self.query(locator);
        let picked = locator.pick.index(matches.len()).map(|i| PickedElement {
            visible: self.is_visible(matches[i]),
            text: self.text_content(matches[i]),
        });
        ElementState {
            count: matches.len(),
            picked,
        }
    }

    /// Attribute value of a node
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node].attrs.get(name).map(String::as_str)
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in &self.nodes[node].children {
            out.push(child);
            out.extend(self.descendants(child));
        }
        out
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let n = &self.nodes[node];
        if compound.tag.as_ref().is_some_and(|t| *t != n.tag) {
            return false;
        }
        if compound
            .id
            .as_ref()
            .is_some_and(|id| self.attr(node, "id") != Some(id.as_str()))
        {
            return false;
        }
        let classes: Vec<&str> = self
            .attr(node, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default();
        if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
        compound.attrs.iter().all(|test| {
            let Some(actual) = self.attr(node, &test.name) else {
                return false;
            };
            match test.op {
                AttrOp::Exists => true,
                AttrOp::Equals => actual == test.value,
                AttrOp::Contains => actual.contains(test.value.as_str()),
                AttrOp::Prefix => actual.starts_with(test.value.as_str()),
                AttrOp::Suffix => actual.ends_with(test.value.as_str()),
            }
        })
    }

    fn matches_chain(&self, node: NodeId, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }
        let mut current = self.nodes[node].parent;
        for compound in ancestors.iter().rev() {
            loop {
                let Some(id) = current else {
                    return false;
                };
                current = self.nodes[id].parent;
                if self.matches_compound(id, compound) {
                    break;
                }
            }
        }
        true
    }
}

/// Fluent element construction
#[derive(Debug)]
pub struct NodeBuilder<'a> {
    dom: &'a mut MockDom,
    id: NodeId,
}

impl NodeBuilder<'_> {
    /// Own text
    pub fn text(self, text: &str) -> Self {
        self.dom.nodes[self.id].text = text.to_string();
        self
    }

    /// Attribute
    pub fn attr(self, name: &str, value: &str) -> Self {
        self.dom.nodes[self.id]
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Space-separated classes
    pub fn class(self, classes: &str) -> Self {
        self.attr("class", classes)
    }

    /// Initial value (inputs, selects)
    pub fn value(self, value: &str) -> Self {
        self.dom.nodes[self.id].value = value.to_string();
        self
    }

    /// Not rendered
    pub fn hidden(self) -> Self {
        self.dom.nodes[self.id].hidden = true;
        self
    }

    /// Disabled control
    pub fn disabled(self) -> Self {
        self.attr("disabled", "")
    }

    /// Rendered only once the driver's clock reaches `at`
    pub fn visible_from(self, at: Duration) -> Self {
        self.dom.nodes[self.id].visible_from = Some(at);
        self
    }

    /// Node id for adding children
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }
}

// =============================================================================
// CSS SUBSET
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

/// Parse a descendant chain of compound selectors
fn parse_css(selector: &str) -> Option<Vec<Compound>> {
    let chain: Option<Vec<Compound>> = split_outside_brackets(selector)
        .iter()
        .map(|part| parse_compound(part))
        .collect();
    chain.filter(|c| !c.is_empty())
}

fn split_outside_brackets(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    for ch in selector.chars() {
        match (ch, quote) {
            ('"' | '\'', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            ('[', None) => depth += 1,
            (']', None) => depth = depth.saturating_sub(1),
            (c, None) if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_compound(part: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let is_delim = |c: char| matches!(c, '.' | '#' | '[');
    let tag_end = part.find(is_delim).unwrap_or(part.len());
    let tag = &part[..tag_end];
    if !tag.is_empty() && tag != "*" {
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return None;
        }
        compound.tag = Some(tag.to_ascii_lowercase());
    }
    let mut rest = &part[tag_end..];
    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let end = rest[1..].find(is_delim).map_or(rest.len(), |i| i + 1);
                let name = &rest[1..end];
                if name.is_empty() || name.contains(':') {
                    return None;
                }
                if first == '.' {
                    compound.classes.push(name.to_string());
                } else {
                    compound.id = Some(name.to_string());
                }
                rest = &rest[end..];
            }
            '[' => {
                let end = rest.find(']')?;
                compound.attrs.push(parse_attr(&rest[1..end])?);
                rest = &rest[end + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn parse_attr(inner: &str) -> Option<AttrTest> {
    let Some(eq) = inner.find('=') else {
        let name = inner.trim();
        return (!name.is_empty()).then(|| AttrTest {
            name: name.to_string(),
            op: AttrOp::Exists,
            value: String::new(),
        });
    };
    let (name_part, op) = match inner[..eq].chars().last() {
        Some('*') => (&inner[..eq - 1], AttrOp::Contains),
        Some('^') => (&inner[..eq - 1], AttrOp::Prefix),
        Some('$') => (&inner[..eq - 1], AttrOp::Suffix),
        _ => (&inner[..eq], AttrOp::Equals),
    };
    let value = inner[eq + 1..]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    Some(AttrTest {
        name: name_part.trim().to_string(),
        op,
        value,
    })
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// DRIVER
// =============================================================================

/// A recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `navigate(url)`
    Navigate(String),
    /// `act(locator, interaction)`
    Act {
        /// Locator description
        target: String,
        /// Interaction verb
        verb: &'static str,
    },
    /// `arm_dialogs`
    ArmDialogs,
    /// `screenshot(full_page)`
    Screenshot {
        /// Full page requested
        full_page: bool,
    },
    /// `close()`
    Close,
}

struct Reaction {
    target: Locator,
    confirm: Option<String>,
    effect: EffectFn,
}

struct MockState {
    clock: Option<ManualClock>,
    origin: String,
    url: String,
    dom: MockDom,
    routes: BTreeMap<String, RouteFn>,
    store: MockStore,
    reactions: Vec<Reaction>,
    dialogs: Option<DialogPolicy>,
    handled_dialogs: Vec<HandledDialog>,
    calls: Vec<MockCall>,
    probes: Vec<String>,
    fail_state_reads: bool,
    fail_screenshots: bool,
    fail_close: bool,
}

impl MockState {
    fn sync_time(&mut self) {
        if let Some(ref clock) = self.clock {
            self.dom.now = clock.now();
        }
    }

    fn load(&mut self, url: &str) -> VerifyResult<()> {
        let path = path_of(url);
        let route = self
            .routes
            .get(&path)
            .cloned()
            .ok_or_else(|| VerifyError::navigation(url, "server responded with status 404"))?;
        if let Some((scheme, rest)) = url.split_once("://") {
            let host = rest.split('/').next().unwrap_or(rest);
            self.origin = format!("{scheme}://{host}");
        }
        self.url = format!("{}{path}", self.origin);
        self.dom = MockDom::new();
        self.sync_time();
        route(&mut self.dom, &self.store);
        Ok(())
    }

    fn follow_redirect(&mut self) -> VerifyResult<()> {
        if let Some(path) = self.dom.redirect.take() {
            self.load(&path)?;
        }
        Ok(())
    }

    fn click(&mut self, locator: &Locator, node: NodeId) -> VerifyResult<()> {
        let dom = &self.dom;
        let reaction = self.reactions.iter().find(|r| {
            let targets = dom.query(&r.target);
            let mut current = Some(node);
            while let Some(id) = current {
                if targets.contains(&id) {
                    return true;
                }
                current = dom.nodes[id].parent;
            }
            false
        });
        let Some(reaction) = reaction else {
            let href = dom
                .closest(node, "a")
                .and_then(|a| dom.attr(a, "href"))
                .map(str::to_string);
            if let Some(href) = href {
                return self.load(&href);
            }
            return Ok(());
        };

        let effect = Arc::clone(&reaction.effect);
        if let Some(message) = reaction.confirm.clone() {
            let Some(policy) = self.dialogs else {
                return Err(VerifyError::interaction(
                    locator.description(),
                    "confirm dialog opened with no handler armed",
                ));
            };
            self.handled_dialogs.push(HandledDialog {
                dialog_type: DialogType::Confirm,
                message,
                accepted: policy.accepts(),
            });
            if !policy.accepts() {
                return Ok(());
            }
        }
        effect(&mut self.dom, &mut self.store, node);
        self.follow_redirect()
    }
}

/// Scriptable in-memory page
///
/// Clones share state, so a test keeps one handle for inspection while the
/// orchestrator owns another through [`MockLauncher`].
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MockDriver")
            .field("url", &state.url)
            .field("routes", &state.routes.keys().collect::<Vec<_>>())
            .field("calls", &state.calls.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                clock: None,
                origin: "http://mock.test".into(),
                url: "about:blank".into(),
                dom: MockDom::new(),
                routes: BTreeMap::new(),
                store: MockStore::new(),
                reactions: Vec::new(),
                dialogs: None,
                handled_dialogs: Vec::new(),
                calls: Vec::new(),
                probes: Vec::new(),
                fail_state_reads: false,
                fail_screenshots: false,
                fail_close: false,
            })),
        }
    }

    /// Evaluate `visible_from` against a shared virtual clock
    #[must_use]
    pub fn with_clock(clock: ManualClock) -> Self {
        let driver = Self::new();
        driver.lock().clock = Some(clock);
        driver
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a page builder for `path`
    pub fn route<F>(&self, path: &str, build: F) -> &Self
    where
        F: Fn(&mut MockDom, &MockStore) + Send + Sync + 'static,
    {
        self.lock().routes.insert(path.to_string(), Arc::new(build));
        self
    }

    /// Run `effect` when an element matching `target` (or inside it) is clicked
    pub fn on_click<F>(&self, target: Locator, effect: F) -> &Self
    where
        F: Fn(&mut MockDom, &mut MockStore, NodeId) + Send + Sync + 'static,
    {
        self.lock().reactions.push(Reaction {
            target,
            confirm: None,
            effect: Arc::new(effect),
        });
        self
    }

    /// Like [`on_click`](Self::on_click), but the click opens a confirm dialog
    ///
    /// Without an armed handler the click fails; with a dismissing handler
    /// the effect does not run.
    pub fn on_confirmed_click<F>(&self, target: Locator, message: &str, effect: F) -> &Self
    where
        F: Fn(&mut MockDom, &mut MockStore, NodeId) + Send + Sync + 'static,
    {
        self.lock().reactions.push(Reaction {
            target,
            confirm: Some(message.to_string()),
            effect: Arc::new(effect),
        });
        self
    }

    /// Modify the current page directly
    pub fn render<F: FnOnce(&mut MockDom)>(&self, f: F) {
        let mut state = self.lock();
        f(&mut state.dom);
    }

    /// Seed a store collection
    pub fn seed(&self, key: &str, values: &[&str]) {
        self.lock()
            .store
            .insert(key.to_string(), values.iter().map(|v| (*v).to_string()).collect());
    }

    /// Read a store collection
    #[must_use]
    pub fn records(&self, key: &str) -> Vec<String> {
        self.lock().store.get(key).cloned().unwrap_or_default()
    }

    /// Make every element-state read fail as if the page stopped answering
    pub fn fail_state_reads(&self, fail: bool) {
        self.lock().fail_state_reads = fail;
    }

    /// Make every screenshot fail
    pub fn fail_screenshots(&self, fail: bool) {
        self.lock().fail_screenshots = fail;
    }

    /// Make `close` report an error (after counting the call)
    pub fn fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Calls made so far
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of `close` calls
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Close))
            .count()
    }

    /// Descriptions of every probed locator, in order
    #[must_use]
    pub fn probed(&self) -> Vec<String> {
        self.lock().probes.clone()
    }

    /// Dialogs answered by the armed handler
    #[must_use]
    pub fn handled_dialogs(&self) -> Vec<HandledDialog> {
        self.lock().handled_dialogs.clone()
    }

    /// Value of the element `locator` picks on the current page
    #[must_use]
    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.lock().dom.value_of(locator)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> VerifyResult<()> {
        let mut state = self.lock();
        state.calls.push(MockCall::Navigate(url.to_string()));
        state.load(url)
    }

    async fn current_url(&self) -> VerifyResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn probe(&self, locator: &Locator) -> VerifyResult<ElementState> {
        let mut state = self.lock();
        state.sync_time();
        state.probes.push(locator.description());
        if state.fail_state_reads {
            return Err(VerifyError::navigation(
                state.url.clone(),
                "page stopped responding (injected)",
            ));
        }
        Ok(state.dom.state(locator))
    }

    async fn act(&self, locator: &Locator, interaction: &Interaction) -> VerifyResult<()> {
        let mut state = self.lock();
        state.sync_time();
        state.calls.push(MockCall::Act {
            target: locator.description(),
            verb: interaction.verb(),
        });
        let target = locator.description();
        let node = state
            .dom
            .pick(locator)
            .ok_or_else(|| VerifyError::interaction(&target, "no element matches"))?;
        if !state.dom.is_visible(node) {
            return Err(VerifyError::interaction(&target, "element is not visible"));
        }
        if state.dom.attr(node, "disabled").is_some() {
            return Err(VerifyError::interaction(&target, "element is disabled"));
        }
        let tag = state.dom.nodes[node].tag.clone();
        match interaction {
            Interaction::Fill(value) => {
                if tag != "input" && tag != "textarea" {
                    return Err(VerifyError::interaction(&target, format!("<{tag}> is not fillable")));
                }
                state.dom.nodes[node].value = value.clone();
            }
            Interaction::Select(value) => {
                if tag != "select" {
                    return Err(VerifyError::interaction(&target, format!("<{tag}> is not a select")));
                }
                let dom = &state.dom;
                let option = dom.nodes[node].children.iter().copied().find(|&o| {
                    dom.attr(o, "value") == Some(value.as_str()) || dom.text_content(o) == *value
                });
                let Some(option) = option else {
                    return Err(VerifyError::interaction(&target, format!("no option {value:?}")));
                };
                let chosen = dom
                    .attr(option, "value")
                    .map_or_else(|| dom.text_content(option), str::to_string);
                state.dom.nodes[node].value = chosen;
            }
            Interaction::Upload(path) => {
                if tag != "input" || state.dom.attr(node, "type") != Some("file") {
                    return Err(VerifyError::interaction(&target, "not a file input"));
                }
                state.dom.nodes[node].value = path.display().to_string();
            }
            Interaction::Click => state.click(locator, node)?,
        }
        Ok(())
    }

    async fn arm_dialogs(&self, policy: DialogPolicy) -> VerifyResult<()> {
        let mut state = self.lock();
        state.calls.push(MockCall::ArmDialogs);
        state.dialogs = Some(policy);
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> VerifyResult<Vec<u8>> {
        let mut state = self.lock();
        state.calls.push(MockCall::Screenshot { full_page });
        if state.fail_screenshots {
            return Err(VerifyError::screenshot("capture failed (injected)"));
        }
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(state.url.as_bytes());
        Ok(png)
    }

    async fn close(&self) -> VerifyResult<()> {
        let mut state = self.lock();
        state.calls.push(MockCall::Close);
        if state.fail_close {
            return Err(VerifyError::launch("browser already gone (injected)"));
        }
        Ok(())
    }
}

fn path_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map_or("/", |i| &without_scheme[i..])
    } else {
        without_scheme
    };
    let path = path.split(['?', '#']).next().unwrap_or("/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Hands out clones of one [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockLauncher {
    driver: MockDriver,
    fail: Option<String>,
}

impl MockLauncher {
    /// Launch `driver` on every call
    #[must_use]
    pub const fn new(driver: MockDriver) -> Self {
        Self { driver, fail: None }
    }

    /// Fail every launch with `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            driver: MockDriver::new(),
            fail: Some(message.into()),
        }
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self) -> VerifyResult<Box<dyn Driver>> {
        if let Some(ref message) = self.fail {
            return Err(VerifyError::launch(message.clone()));
        }
        Ok(Box::new(self.driver.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod css_tests {
        use super::*;

        #[test]
        fn test_parse_compound_with_attributes() {
            let chain = parse_css(r#"input[type="password"]"#).unwrap();
            assert_eq!(chain.len(), 1);
            assert_eq!(chain[0].tag.as_deref(), Some("input"));
            assert_eq!(chain[0].attrs[0].name, "type");
            assert_eq!(chain[0].attrs[0].value, "password");
            assert_eq!(chain[0].attrs[0].op, AttrOp::Equals);
        }

        #[test]
        fn test_parse_classes_and_contains() {
            let chain = parse_css(".rounded-full.border-2").unwrap();
            assert_eq!(chain[0].classes, vec!["rounded-full", "border-2"]);
            let chain = parse_css(r#"a[href*="wa.me/94779998888"]"#).unwrap();
            assert_eq!(chain[0].attrs[0].op, AttrOp::Contains);
            assert_eq!(chain[0].attrs[0].value, "wa.me/94779998888");
        }

        #[test]
        fn test_spaces_inside_quotes_do_not_split() {
            let chain =
                parse_css(r#"input[placeholder="Title (e.g., Arrival in Colombo)"]"#).unwrap();
            assert_eq!(chain.len(), 1);
            assert_eq!(chain[0].attrs[0].value, "Title (e.g., Arrival in Colombo)");
        }

        #[test]
        fn test_unsupported_pseudo_matches_nothing() {
            assert!(parse_css("button:has-text(\"Save\")").is_none());
        }

        #[test]
        fn test_path_of() {
            assert_eq!(path_of("http://localhost:3003/admin/tours"), "/admin/tours");
            assert_eq!(path_of("http://localhost:3003"), "/");
            assert_eq!(path_of("/tours?page=2"), "/tours");
        }
    }

    mod query_tests {
        use super::*;

        fn table() -> MockDom {
            let mut dom = MockDom::new();
            let root = dom.root();
            let tbody = dom.add(root, "table").id();
            for title in ["Verification Tour", "Cultural Triangle", "Verification Tour"] {
                let row = dom.add(tbody, "tr").id();
                dom.add(row, "td").text(title);
                dom.add(row, "button").text("Delete");
            }
            dom
        }

        #[test]
        fn test_has_text_filter_and_count() {
            let dom = table();
            let rows = dom.query(&Locator::css("tr").with_text("Verification Tour"));
            assert_eq!(rows.len(), 2);
        }

        #[test]
        fn test_within_scopes_to_picked_parent() {
            let dom = table();
            let button = Locator::css("tr")
                .with_text("Cultural Triangle")
                .locator(Locator::css("button"));
            let id = dom.pick(&button).unwrap();
            let row = dom.closest(id, "tr").unwrap();
            assert!(dom.text_content(row).contains("Cultural Triangle"));
        }

        #[test]
        fn test_text_selector_picks_innermost() {
            let dom = table();
            let hits = dom.query(&Locator::text("Cultural Triangle"));
            assert_eq!(hits.len(), 1);
            assert_eq!(dom.nodes[hits[0]].tag, "td");
        }

        #[test]
        fn test_descendant_chain() {
            let dom = table();
            assert_eq!(dom.query(&Locator::css("table tr button")).len(), 3);
            assert_eq!(dom.query(&Locator::css("tr table")).len(), 0);
        }

        #[test]
        fn test_label_via_aria_and_for() {
            let mut dom = MockDom::new();
            let root = dom.root();
            dom.add(root, "a").attr("aria-label", "Chat on WhatsApp");
            dom.add(root, "label").attr("for", "wa").text("WhatsApp Number");
            dom.add(root, "input").attr("id", "wa");
            assert_eq!(dom.query(&Locator::label("Chat on WhatsApp")).len(), 1);
            let input = dom.pick(&Locator::label("WhatsApp Number")).unwrap();
            assert_eq!(dom.nodes[input].tag, "input");
        }

        #[test]
        fn test_hidden_ancestor_hides_child() {
            let mut dom = MockDom::new();
            let root = dom.root();
            let panel = dom.add(root, "div").hidden().id();
            let item = dom.add(panel, "p").text("Test Destination 1").id();
            assert!(!dom.is_visible(item));
            dom.set_hidden(panel, false);
            assert!(dom.is_visible(item));
        }

        #[test]
        fn test_removed_nodes_are_not_matched() {
            let mut dom = table();
            let first = dom.pick(&Locator::css("tr")).unwrap();
            dom.remove(first);
            assert_eq!(dom.query(&Locator::css("tr")).len(), 2);
        }
    }

    mod driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_unknown_route_is_navigation_error() {
            let driver = MockDriver::new();
            let err = driver.navigate("http://mock.test/missing").await.unwrap_err();
            assert!(matches!(err, VerifyError::Navigation { .. }));
        }

        #[tokio::test]
        async fn test_fill_and_select() {
            let driver = MockDriver::new();
            driver.route("/form", |dom, _| {
                let root = dom.root();
                dom.add(root, "input").attr("name", "title");
                let select = dom.add(root, "select").attr("name", "category").id();
                dom.add(select, "option").attr("value", "Adventure").text("Adventure");
            });
            driver.navigate("http://mock.test/form").await.unwrap();
            let title = Locator::css(r#"input[name="title"]"#);
            driver.act(&title, &Interaction::Fill("Verification Tour".into())).await.unwrap();
            assert_eq!(driver.value_of(&title).as_deref(), Some("Verification Tour"));

            let category = Locator::css(r#"select[name="category"]"#);
            driver.act(&category, &Interaction::Select("Adventure".into())).await.unwrap();
            assert_eq!(driver.value_of(&category).as_deref(), Some("Adventure"));
            let err = driver
                .act(&category, &Interaction::Select("Luxury".into()))
                .await
                .unwrap_err();
            assert!(matches!(err, VerifyError::Interaction { .. }));
        }

        #[tokio::test]
        async fn test_act_on_hidden_or_disabled_fails() {
            let driver = MockDriver::new();
            driver.render(|dom| {
                let root = dom.root();
                dom.add(root, "button").text("Hidden").hidden();
                dom.add(root, "button").text("Disabled").disabled();
            });
            for text in ["Hidden", "Disabled", "Missing"] {
                let err = driver
                    .act(&Locator::css("button").with_text(text), &Interaction::Click)
                    .await
                    .unwrap_err();
                assert!(matches!(err, VerifyError::Interaction { .. }), "{text}");
            }
        }

        #[tokio::test]
        async fn test_confirmed_click_requires_armed_handler() {
            let driver = MockDriver::new();
            driver.render(|dom| {
                let root = dom.root();
                dom.add(root, "button").text("Delete");
            });
            driver.on_confirmed_click(Locator::css("button"), "Are you sure?", |dom, _, node| {
                dom.remove(node);
            });
            let button = Locator::css("button");
            assert!(driver.act(&button, &Interaction::Click).await.is_err());
            assert_eq!(driver.probe(&button).await.unwrap().count, 1);

            driver.arm_dialogs(DialogPolicy::AcceptAll).await.unwrap();
            driver.act(&button, &Interaction::Click).await.unwrap();
            assert_eq!(driver.probe(&button).await.unwrap().count, 0);
            assert_eq!(driver.handled_dialogs().len(), 1);
            assert!(driver.handled_dialogs()[0].accepted);
        }

        #[tokio::test]
        async fn test_rearming_replaces_policy() {
            let driver = MockDriver::new();
            driver.render(|dom| {
                let root = dom.root();
                dom.add(root, "button").text("Delete");
            });
            driver.on_confirmed_click(Locator::css("button"), "Are you sure?", |dom, _, node| {
                dom.remove(node);
            });
            let button = Locator::css("button");
            driver.arm_dialogs(DialogPolicy::AcceptAll).await.unwrap();
            driver.arm_dialogs(DialogPolicy::DismissAll).await.unwrap();
            driver.act(&button, &Interaction::Click).await.unwrap();
            assert_eq!(driver.probe(&button).await.unwrap().count, 1);
            assert!(!driver.handled_dialogs()[0].accepted);
        }

        #[tokio::test]
        async fn test_injected_state_read_failure() {
            let driver = MockDriver::new();
            driver.fail_state_reads(true);
            let err = driver.probe(&Locator::css("h1")).await.unwrap_err();
            assert!(matches!(err, VerifyError::Navigation { .. }));
            driver.fail_state_reads(false);
            assert_eq!(driver.probe(&Locator::css("h1")).await.unwrap().count, 0);
        }

        #[tokio::test]
        async fn test_click_on_link_follows_href() {
            let driver = MockDriver::new();
            driver.route("/tours", |dom, _| {
                let root = dom.root();
                let card = dom.add(root, "div").class("group").id();
                dom.add(card, "a").attr("href", "/tours/1").text("View Details");
            });
            driver.route("/tours/1", |dom, _| {
                let root = dom.root();
                dom.add(root, "h1").text("Verification Tour");
            });
            driver.navigate("http://mock.test/tours").await.unwrap();
            driver
                .act(&Locator::text("View Details"), &Interaction::Click)
                .await
                .unwrap();
            assert_eq!(
                driver.current_url().await.unwrap(),
                "http://mock.test/tours/1"
            );
        }

        #[tokio::test]
        async fn test_screenshot_failure_injection() {
            let driver = MockDriver::new();
            assert!(driver.screenshot(true).await.unwrap().starts_with(b"\x89PNG"));
            driver.fail_screenshots(true);
            assert!(driver.screenshot(true).await.is_err());
        }

        #[tokio::test]
        async fn test_launcher_failure() {
            let err = MockLauncher::failing("no chromium").launch().await.unwrap_err();
            assert!(matches!(err, VerifyError::DriverLaunch { .. }));
        }
    }
}

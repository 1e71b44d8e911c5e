//! In-memory page implementation for testing
//!
//! `MockSite` maps paths to static documents built from `MockNode` trees.
//! `MockPage` resolves locators against the current document with the same
//! rules the in-page resolver script follows, and records every interaction
//! so tests can assert on what a page object actually did.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

use crate::locator::{normalize_whitespace, ElementOp, Filter, Locator, Pick, QueryResult, Selector};
use crate::session::traits::{BrowserContext, LoadState, PageContext, PageOptions};
use crate::Error;

/// PNG file signature, enough for artifact tests
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// One element in a mock document
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    pub tag: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Associated `<label>` text
    pub label: Option<String>,
    pub hidden: bool,
    pub disabled: bool,
    /// Not in the document until this long after the page loaded
    pub appears_after: Option<Duration>,
    /// `<select>` option labels
    pub options: Vec<String>,
    /// Clicking navigates here (links navigate to their href anyway)
    pub navigates_to: Option<String>,
    pub children: Vec<MockNode>,
}

impl MockNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn link(text: &str, href: &str) -> Self {
        Self::new("a").text(text).attr("href", href)
    }

    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Self::new(&format!("h{}", level.clamp(1, 6))).text(text)
    }

    pub fn select(label: &str, options: &[&str]) -> Self {
        let mut node = Self::new("select").label(label);
        node.options = options.iter().map(|o| o.to_string()).collect();
        node
    }

    pub fn searchbox() -> Self {
        Self::new("input").attr("type", "search")
    }

    pub fn nav(label: &str) -> Self {
        Self::new("nav").aria_label(label)
    }

    pub fn cell(text: &str) -> Self {
        Self::new("td").text(text)
    }

    pub fn img(alt: &str) -> Self {
        Self::new("img").attr("alt", alt)
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    pub fn span(text: &str) -> Self {
        Self::new("span").text(text)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn aria_label(self, label: &str) -> Self {
        self.attr("aria-label", label)
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }

    pub fn navigates_to(mut self, path: &str) -> Self {
        self.navigates_to = Some(path.to_string());
        self
    }

    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I: IntoIterator<Item = MockNode>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }
}

/// A static document
#[derive(Debug, Clone, Default)]
pub struct MockDocument {
    pub title: String,
    pub body: Vec<MockNode>,
}

impl MockDocument {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            body: Vec::new(),
        }
    }

    pub fn with(mut self, node: MockNode) -> Self {
        self.body.push(node);
        self
    }

    pub fn with_all<I: IntoIterator<Item = MockNode>>(mut self, nodes: I) -> Self {
        self.body.extend(nodes);
        self
    }
}

/// Paths (optionally with a query string) mapped to documents
#[derive(Debug, Clone)]
pub struct MockSite {
    origin: String,
    pages: HashMap<String, MockDocument>,
}

impl MockSite {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            pages: HashMap::new(),
        }
    }

    pub fn page(mut self, path: &str, document: MockDocument) -> Self {
        self.pages.insert(path.to_string(), document);
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Document served for an absolute URL; unknown paths get a 404 page
    pub fn document(&self, url: &str) -> MockDocument {
        let parsed = match Url::parse(url) {
            Ok(parsed) if parsed.scheme() != "about" => parsed,
            _ => return MockDocument::default(),
        };

        let path = parsed.path();
        let with_query = match parsed.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        self.pages
            .get(&with_query)
            .or_else(|| self.pages.get(path))
            .cloned()
            .unwrap_or_else(|| MockDocument::new("Page not found"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

/// `tag`, `[attr]` or `tag[attr op "value"]`
#[derive(Debug)]
struct SimpleCss {
    tag: Option<String>,
    attr: Option<(String, AttrOp, String)>,
}

impl SimpleCss {
    fn parse(css: &str) -> Result<Self, Error> {
        let unsupported = || Error::internal(format!("Mock page cannot evaluate css {:?}", css));
        let css = css.trim();
        let (tag, rest) = match css.find('[') {
            Some(pos) => (&css[..pos], &css[pos..]),
            None => (css, ""),
        };

        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
            return Err(unsupported());
        }
        let tag = match tag {
            "" | "*" => None,
            tag => Some(tag.to_lowercase()),
        };

        if rest.is_empty() {
            return Ok(Self { tag, attr: None });
        }
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(unsupported)?;

        let ops = [
            ("*=", AttrOp::Contains),
            ("^=", AttrOp::Prefix),
            ("$=", AttrOp::Suffix),
            ("=", AttrOp::Equals),
        ];
        let attr = match ops.iter().find_map(|(tok, op)| inner.find(tok).map(|pos| (pos, *tok, *op))) {
            Some((pos, tok, op)) => {
                let name = inner[..pos].trim().to_string();
                let value = inner[pos + tok.len()..]
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                (name, op, value)
            }
            None => (inner.trim().to_string(), AttrOp::Exists, String::new()),
        };
        Ok(Self { tag, attr: Some(attr) })
    }

    fn matches(&self, node: &MockNode) -> bool {
        if let Some(tag) = &self.tag {
            if &node.tag != tag {
                return false;
            }
        }
        match &self.attr {
            None => true,
            Some((name, op, value)) => match node.attributes.get(name) {
                None => false,
                Some(actual) => match op {
                    AttrOp::Exists => true,
                    AttrOp::Equals => actual == value,
                    AttrOp::Contains => actual.contains(value.as_str()),
                    AttrOp::Prefix => actual.starts_with(value.as_str()),
                    AttrOp::Suffix => actual.ends_with(value.as_str()),
                },
            },
        }
    }
}

struct Flat<'a> {
    node: &'a MockNode,
    parent: Option<usize>,
    /// Index of the last descendant
    end: usize,
    visible: bool,
}

/// Flattened document in tree order
struct Dom<'a> {
    nodes: Vec<Flat<'a>>,
}

impl<'a> Dom<'a> {
    fn build(doc: &'a MockDocument, age: Duration) -> Self {
        fn walk<'a>(nodes: &'a [MockNode], parent: Option<usize>, parent_visible: bool, age: Duration, out: &mut Vec<Flat<'a>>) {
            for node in nodes {
                if node.appears_after.map_or(false, |delay| age < delay) {
                    continue;
                }
                let idx = out.len();
                let visible = parent_visible && !node.hidden;
                out.push(Flat {
                    node,
                    parent,
                    end: idx,
                    visible,
                });
                walk(&node.children, Some(idx), visible, age, out);
                out[idx].end = out.len() - 1;
            }
        }

        let mut nodes = Vec::new();
        walk(&doc.body, None, true, age, &mut nodes);
        Self { nodes }
    }

    fn contains(&self, ancestor: usize, other: usize) -> bool {
        ancestor < other && other <= self.nodes[ancestor].end
    }

    fn text(&self, idx: usize) -> String {
        let parts: Vec<&str> = self.nodes[idx..=self.nodes[idx].end]
            .iter()
            .map(|f| f.node.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        normalize_whitespace(&parts.join(" "))
    }

    fn role(&self, idx: usize) -> Option<String> {
        let node = self.nodes[idx].node;
        if let Some(role) = node.attributes.get("role") {
            return role.split_whitespace().next().map(str::to_string);
        }
        let input_type = || {
            node.attributes
                .get("type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "text".to_string())
        };
        let role = match node.tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "a" | "area" if node.attributes.contains_key("href") => "link",
            "button" => "button",
            "select" => "combobox",
            "textarea" => "textbox",
            "nav" => "navigation",
            "img" if node.attributes.get("alt").map_or(true, |alt| !alt.is_empty()) => "img",
            "td" => "cell",
            "th" => "columnheader",
            "ul" | "ol" => "list",
            "li" => "listitem",
            "option" => "option",
            "dialog" => "dialog",
            "input" => match input_type().as_str() {
                "button" | "submit" | "reset" | "image" => "button",
                "checkbox" => "checkbox",
                "radio" => "radio",
                "search" => "searchbox",
                "hidden" => return None,
                _ => "textbox",
            },
            _ => return None,
        };
        Some(role.to_string())
    }

    fn level(&self, idx: usize) -> Option<u8> {
        let node = self.nodes[idx].node;
        match node.tag.as_bytes() {
            [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
            _ => node.attributes.get("aria-level").and_then(|l| l.parse().ok()),
        }
    }

    fn labels(&self, idx: usize) -> Vec<String> {
        let node = self.nodes[idx].node;
        node.attributes
            .get("aria-label")
            .into_iter()
            .chain(node.label.iter())
            .cloned()
            .collect()
    }

    fn accessible_name(&self, idx: usize) -> String {
        let labels = self.labels(idx);
        if !labels.is_empty() {
            return labels.join(" ");
        }
        let node = self.nodes[idx].node;
        let attr = |name: &str| node.attributes.get(name).cloned().unwrap_or_default();
        match node.tag.as_str() {
            "img" => attr("alt"),
            "input" => match attr("type").as_str() {
                "button" | "submit" | "reset" => attr("value"),
                _ => node
                    .attributes
                    .get("placeholder")
                    .or_else(|| node.attributes.get("title"))
                    .cloned()
                    .unwrap_or_default(),
            },
            "select" | "textarea" => attr("title"),
            _ => {
                let text = self.text(idx);
                if text.is_empty() {
                    attr("title")
                } else {
                    text
                }
            }
        }
    }

    fn is_disabled(&self, idx: usize) -> bool {
        let node = self.nodes[idx].node;
        node.disabled || node.attributes.get("aria-disabled").map_or(false, |v| v == "true")
    }

    /// First navigation target on the element or its ancestors, as a click would bubble
    fn navigation_target(&self, idx: usize) -> Option<String> {
        let mut current = Some(idx);
        while let Some(i) = current {
            let node = self.nodes[i].node;
            if let Some(target) = &node.navigates_to {
                return Some(target.clone());
            }
            if node.tag == "a" {
                if let Some(href) = node.attributes.get("href") {
                    return Some(href.clone());
                }
            }
            current = self.nodes[i].parent;
        }
        None
    }

    fn candidates(&self, root: Option<usize>, selector: &Selector) -> Result<Vec<usize>, Error> {
        let range = match root {
            Some(r) => r + 1..self.nodes[r].end + 1,
            None => 0..self.nodes.len(),
        };

        let mut out = Vec::new();
        match selector {
            Selector::Css { css } => {
                let css = SimpleCss::parse(css)?;
                out.extend(range.filter(|&i| css.matches(self.nodes[i].node)));
            }
            Selector::Role { role, name, level } => {
                for i in range {
                    if self.role(i).as_deref() != Some(role.as_str()) || !self.nodes[i].visible {
                        continue;
                    }
                    if level.is_some() && self.level(i) != *level {
                        continue;
                    }
                    if let Some(name) = name {
                        if !name.matches(&self.accessible_name(i))? {
                            continue;
                        }
                    }
                    out.push(i);
                }
            }
            Selector::Label { text } => {
                for i in range {
                    for label in self.labels(i) {
                        if text.matches(&label)? {
                            out.push(i);
                            break;
                        }
                    }
                }
            }
            Selector::Text { text } => {
                let mut hits = Vec::new();
                for i in range {
                    if text.matches(&self.text(i))? {
                        hits.push(i);
                    }
                }
                out.extend(
                    hits.iter()
                        .copied()
                        .filter(|&i| !hits.iter().any(|&j| self.contains(i, j))),
                );
            }
        }
        Ok(out)
    }

    fn resolve(&self, locator: &Locator) -> Result<Vec<usize>, Error> {
        let roots: Vec<Option<usize>> = match &locator.scope {
            Some(scope) => self.resolve(scope)?.into_iter().map(Some).collect(),
            None => vec![None],
        };

        let mut found = Vec::new();
        for root in roots {
            found.extend(self.candidates(root, &locator.selector)?);
        }
        found.sort_unstable();
        found.dedup();

        for filter in &locator.filters {
            let mut kept = Vec::with_capacity(found.len());
            for i in found {
                let keep = match filter {
                    Filter::HasText { text } => text.matches(&self.text(i))?,
                    Filter::HasNotText { text } => !text.matches(&self.text(i))?,
                };
                if keep {
                    kept.push(i);
                }
            }
            found = kept;
        }

        Ok(match locator.pick {
            Pick::All => found,
            Pick::First => found.into_iter().take(1).collect(),
            Pick::Last => found.pop().into_iter().collect(),
            Pick::Nth { index } => found.into_iter().skip(index).take(1).collect(),
        })
    }
}

/// Side effect of an action, applied after resolution releases the document
enum Effect {
    None,
    Click { name: String, target: Option<String> },
    Fill { name: String, value: String },
    Select { name: String, label: String },
}

#[derive(Debug)]
struct PageState {
    url: String,
    doc: MockDocument,
    loaded_at: Instant,
    history: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    selections: Vec<(String, String)>,
    keys: Vec<String>,
}

static NEXT_PAGE: AtomicU64 = AtomicU64::new(0);

/// In-memory page
#[derive(Debug)]
pub struct MockPage {
    id: String,
    site: Arc<MockSite>,
    state: Mutex<PageState>,
    active: AtomicBool,
}

impl MockPage {
    pub fn new(site: Arc<MockSite>) -> Self {
        Self {
            id: format!("mock-page-{}", NEXT_PAGE.fetch_add(1, Ordering::Relaxed)),
            site,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                doc: MockDocument::default(),
                loaded_at: Instant::now(),
                history: Vec::new(),
                clicks: Vec::new(),
                fills: Vec::new(),
                selections: Vec::new(),
                keys: Vec::new(),
            }),
            active: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PageState>, Error> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(Error::page_closed(&self.id));
        }
        self.state
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))
    }

    fn load(&self, state: &mut PageState, url: String) {
        state.doc = self.site.document(&url);
        state.loaded_at = Instant::now();
        state.history.push(url.clone());
        state.url = url;
    }

    fn read<T, F: FnOnce(&PageState) -> T>(&self, f: F) -> T
    where
        T: Default,
    {
        self.state.lock().map(|s| f(&*s)).unwrap_or_default()
    }

    /// Every URL loaded, in order
    pub fn history(&self) -> Vec<String> {
        self.read(|s| s.history.clone())
    }

    /// Accessible names of clicked elements
    pub fn clicks(&self) -> Vec<String> {
        self.read(|s| s.clicks.clone())
    }

    /// (control name, value) for every fill
    pub fn fills(&self) -> Vec<(String, String)> {
        self.read(|s| s.fills.clone())
    }

    /// (control name, option label) for every select
    pub fn selections(&self) -> Vec<(String, String)> {
        self.read(|s| s.selections.clone())
    }

    /// Keys pressed
    pub fn keys(&self) -> Vec<String> {
        self.read(|s| s.keys.clone())
    }

    pub fn current_url(&self) -> String {
        self.read(|s| s.url.clone())
    }

    fn evaluate(state: &PageState, locator: &Locator, op: &ElementOp) -> Result<(QueryResult, Effect), Error> {
        let dom = Dom::build(&state.doc, state.loaded_at.elapsed());
        let found = dom.resolve(locator)?;

        if let ElementOp::Count = op {
            return Ok((QueryResult::Count { value: found.len() }, Effect::None));
        }
        if found.len() > 1 {
            return Ok((QueryResult::Ambiguous { count: found.len() }, Effect::None));
        }

        let el = found.first().copied();
        if let ElementOp::Visible = op {
            let value = el.map_or(false, |i| dom.nodes[i].visible);
            return Ok((QueryResult::Visible { value }, Effect::None));
        }
        let i = match el {
            Some(i) => i,
            None => return Ok((QueryResult::Missing, Effect::None)),
        };

        let node = dom.nodes[i].node;
        let result = match op {
            ElementOp::Text => QueryResult::Text { value: dom.text(i) },
            ElementOp::Attribute { name } => QueryResult::Attribute {
                value: node.attributes.get(name).cloned(),
            },
            _ if !dom.nodes[i].visible => QueryResult::Hidden,
            _ if dom.is_disabled(i) => QueryResult::Disabled,
            ElementOp::Click => {
                let effect = Effect::Click {
                    name: dom.accessible_name(i),
                    target: dom.navigation_target(i),
                };
                return Ok((QueryResult::Done, effect));
            }
            ElementOp::Fill { value } => {
                let effect = Effect::Fill {
                    name: dom.accessible_name(i),
                    value: value.clone(),
                };
                return Ok((QueryResult::Done, effect));
            }
            ElementOp::SelectOption { label } => {
                let wanted = normalize_whitespace(label);
                if !node.options.iter().any(|o| normalize_whitespace(o) == wanted) {
                    QueryResult::NoSuchOption {
                        available: node.options.clone(),
                    }
                } else {
                    let effect = Effect::Select {
                        name: dom.accessible_name(i),
                        label: label.clone(),
                    };
                    return Ok((QueryResult::Done, effect));
                }
            }
            ElementOp::Count | ElementOp::Visible => QueryResult::Missing,
        };
        Ok((result, Effect::None))
    }
}

#[async_trait]
impl PageContext for MockPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        let mut state = self.lock()?;
        self.load(&mut state, url.to_string());
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: Duration) -> Result<(), Error> {
        self.lock().map(|_| ())
    }

    async fn url(&self) -> Result<String, Error> {
        Ok(self.lock()?.url.clone())
    }

    async fn title(&self) -> Result<String, Error> {
        Ok(self.lock()?.doc.title.clone())
    }

    async fn query(&self, locator: &Locator, op: &ElementOp) -> Result<QueryResult, Error> {
        let mut state = self.lock()?;
        let (result, effect) = Self::evaluate(&state, locator, op)?;

        match effect {
            Effect::None => {}
            Effect::Click { name, target } => {
                state.clicks.push(name);
                if let Some(target) = target {
                    let url = Url::parse(&state.url)
                        .and_then(|base| base.join(&target))
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| format!("{}{}", self.site.origin(), target));
                    self.load(&mut state, url);
                }
            }
            Effect::Fill { name, value } => state.fills.push((name, value)),
            Effect::Select { name, label } => state.selections.push((name, label)),
        }
        Ok(result)
    }

    async fn press_key(&self, key: &str) -> Result<(), Error> {
        self.lock()?.keys.push(key.to_string());
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        let _state = self.lock()?;
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn close(&self) -> Result<(), Error> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Browser serving a [`MockSite`]
#[derive(Debug)]
pub struct MockBrowser {
    site: Arc<MockSite>,
    pages: Mutex<Vec<Arc<MockPage>>>,
    refuse_next_page: AtomicBool,
}

impl MockBrowser {
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            pages: Mutex::new(Vec::new()),
            refuse_next_page: AtomicBool::new(false),
        }
    }

    pub fn site(&self) -> &Arc<MockSite> {
        &self.site
    }

    /// Every page ever opened
    pub fn pages(&self) -> Vec<Arc<MockPage>> {
        self.pages.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Pages not yet closed
    pub fn open_pages(&self) -> usize {
        self.pages().iter().filter(|p| p.is_active()).count()
    }

    /// Make the next `new_page` call fail
    pub fn refuse_next_page(&self) {
        self.refuse_next_page.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserContext for MockBrowser {
    async fn new_page(&self, _options: PageOptions) -> Result<Arc<dyn PageContext>, Error> {
        if self.refuse_next_page.swap(false, Ordering::SeqCst) {
            return Err(Error::cdp("Target.createTarget refused"));
        }
        let page = Arc::new(MockPage::new(Arc::clone(&self.site)));
        self.pages
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .push(Arc::clone(&page));
        Ok(page)
    }

    async fn close(&self) -> Result<(), Error> {
        for page in self.pages() {
            page.close().await?;
        }
        Ok(())
    }
}

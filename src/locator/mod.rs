//! # 定位器解析策略
//!
//! 把语义化的元素描述（角色 + 可访问名称、标签、文本模式、结构选择器）表示为纯值，
//! 每次交互时都重新针对当前文档解析，从不缓存 DOM 节点。
//!
//! ## 主要功能
//! - **优先可访问性树**: `Role` 选择器按角色与可访问名称匹配
//! - **显式精确度**: `TextMatch` 在调用处明确 exact / substring / pattern
//! - **作用域与筛选**: `within`、`has_text`、`has_not_text`、`first/last/nth`
//! - **查询协议**: `Query` / `ElementOp` / `QueryResult` 是页面驱动的统一接口
//!
//! ## 模块结构
//! - `script`: 把查询编译为在页面中执行的解析脚本

pub mod script;

use crate::{Error, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collapse runs of whitespace and trim, the way rendered text is compared
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How a piece of text is compared against rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextMatch {
    /// Whitespace-normalized, case-sensitive equality
    Exact { value: String },
    /// Case-insensitive containment
    Substring { value: String },
    /// Regular expression search
    Pattern { value: String, case_insensitive: bool },
}

impl TextMatch {
    pub fn exact<S: Into<String>>(value: S) -> Self {
        TextMatch::Exact { value: value.into() }
    }

    pub fn substring<S: Into<String>>(value: S) -> Self {
        TextMatch::Substring { value: value.into() }
    }

    /// Case-insensitive regular expression
    pub fn pattern<S: Into<String>>(value: S) -> Self {
        TextMatch::Pattern {
            value: value.into(),
            case_insensitive: true,
        }
    }

    /// Case-sensitive regular expression
    pub fn pattern_cs<S: Into<String>>(value: S) -> Self {
        TextMatch::Pattern {
            value: value.into(),
            case_insensitive: false,
        }
    }

    /// Compare against raw rendered text
    pub fn matches(&self, raw: &str) -> Result<bool> {
        let text = normalize_whitespace(raw);
        match self {
            TextMatch::Exact { value } => Ok(text == normalize_whitespace(value)),
            TextMatch::Substring { value } => Ok(text
                .to_lowercase()
                .contains(&normalize_whitespace(value).to_lowercase())),
            TextMatch::Pattern {
                value,
                case_insensitive,
            } => {
                let re = RegexBuilder::new(value)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|e| Error::internal(format!("Invalid text pattern /{}/: {}", value, e)))?;
                Ok(re.is_match(&text))
            }
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatch::Exact { value } => write!(f, "{:?}", value),
            TextMatch::Substring { value } => write!(f, "~{:?}", value),
            TextMatch::Pattern {
                value,
                case_insensitive,
            } => write!(f, "/{}/{}", value, if *case_insensitive { "i" } else { "" }),
        }
    }
}

/// ARIA roles the page objects address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Button,
    Cell,
    Checkbox,
    Columnheader,
    Combobox,
    Dialog,
    Heading,
    Img,
    Link,
    List,
    Listbox,
    Listitem,
    Navigation,
    Option,
    Radio,
    Searchbox,
    Tab,
    Textbox,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Cell => "cell",
            Role::Checkbox => "checkbox",
            Role::Columnheader => "columnheader",
            Role::Combobox => "combobox",
            Role::Dialog => "dialog",
            Role::Heading => "heading",
            Role::Img => "img",
            Role::Link => "link",
            Role::List => "list",
            Role::Listbox => "listbox",
            Role::Listitem => "listitem",
            Role::Navigation => "navigation",
            Role::Option => "option",
            Role::Radio => "radio",
            Role::Searchbox => "searchbox",
            Role::Tab => "tab",
            Role::Textbox => "textbox",
        }
    }
}

/// What to look for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Accessibility-tree lookup; only rendered elements take part
    Role {
        role: Role,
        name: Option<TextMatch>,
        level: Option<u8>,
    },
    /// Form control or region by its label
    Label { text: TextMatch },
    /// Innermost elements whose text matches
    Text { text: TextMatch },
    /// Structural fallback
    Css { css: String },
}

/// Post-resolution narrowing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    HasText { text: TextMatch },
    HasNotText { text: TextMatch },
}

/// Which of the resolved elements to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pick {
    All,
    First,
    Last,
    Nth { index: usize },
}

/// A semantic element description, resolved afresh on every use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scope: Option<Box<Locator>>,
    pub selector: Selector,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub pick: Pick,
}

impl Locator {
    fn from_selector(selector: Selector) -> Self {
        Self {
            scope: None,
            selector,
            filters: Vec::new(),
            pick: Pick::All,
        }
    }

    pub fn role(role: Role) -> Self {
        Self::from_selector(Selector::Role {
            role,
            name: None,
            level: None,
        })
    }

    pub fn label(text: TextMatch) -> Self {
        Self::from_selector(Selector::Label { text })
    }

    pub fn label_exact(text: &str) -> Self {
        Self::label(TextMatch::exact(text))
    }

    pub fn text(text: TextMatch) -> Self {
        Self::from_selector(Selector::Text { text })
    }

    pub fn text_exact(text: &str) -> Self {
        Self::text(TextMatch::exact(text))
    }

    /// Case-insensitive regular expression over rendered text
    pub fn text_pattern(pattern: &str) -> Self {
        Self::text(TextMatch::pattern(pattern))
    }

    pub fn css<S: Into<String>>(css: S) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    /// Accessible name; only meaningful on role locators
    pub fn name(mut self, name: TextMatch) -> Self {
        if let Selector::Role { name: slot, .. } = &mut self.selector {
            *slot = Some(name);
        }
        self
    }

    pub fn name_exact(self, name: &str) -> Self {
        self.name(TextMatch::exact(name))
    }

    pub fn name_pattern(self, pattern: &str) -> Self {
        self.name(TextMatch::pattern(pattern))
    }

    /// Heading level; only meaningful on heading role locators
    pub fn level(mut self, level: u8) -> Self {
        if let Selector::Role { level: slot, .. } = &mut self.selector {
            *slot = Some(level);
        }
        self
    }

    /// Resolve inside every element `scope` resolves to
    pub fn within(mut self, scope: &Locator) -> Self {
        self.scope = Some(Box::new(scope.clone()));
        self
    }

    /// Child locator scoped to this one
    pub fn locator(&self, child: Locator) -> Locator {
        child.within(self)
    }

    pub fn has_text(mut self, text: TextMatch) -> Self {
        self.filters.push(Filter::HasText { text });
        self
    }

    pub fn has_not_text(mut self, text: TextMatch) -> Self {
        self.filters.push(Filter::HasNotText { text });
        self
    }

    pub fn first(mut self) -> Self {
        self.pick = Pick::First;
        self
    }

    pub fn last(mut self) -> Self {
        self.pick = Pick::Last;
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.pick = Pick::Nth { index };
        self
    }

    /// Human-readable description used in errors and logs
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(scope) = &self.scope {
            out.push_str(&scope.describe());
            out.push_str(" >> ");
        }

        match &self.selector {
            Selector::Role { role, name, level } => {
                out.push_str("role=");
                out.push_str(role.as_str());
                if let Some(level) = level {
                    out.push_str(&format!("[level={}]", level));
                }
                if let Some(name) = name {
                    out.push_str(&format!("[name={}]", name));
                }
            }
            Selector::Label { text } => out.push_str(&format!("label={}", text)),
            Selector::Text { text } => out.push_str(&format!("text={}", text)),
            Selector::Css { css } => out.push_str(&format!("css={}", css)),
        }

        for filter in &self.filters {
            match filter {
                Filter::HasText { text } => out.push_str(&format!(" >> has-text={}", text)),
                Filter::HasNotText { text } => out.push_str(&format!(" >> has-not-text={}", text)),
            }
        }

        match self.pick {
            Pick::All => {}
            Pick::First => out.push_str(" >> first"),
            Pick::Last => out.push_str(" >> last"),
            Pick::Nth { index } => out.push_str(&format!(" >> nth={}", index)),
        }

        out
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// One operation against whatever a locator currently resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementOp {
    Count,
    Visible,
    Text,
    Attribute { name: String },
    Click,
    Fill { value: String },
    SelectOption { label: String },
}

impl ElementOp {
    /// Whether the operation changes document state
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            ElementOp::Click | ElementOp::Fill { .. } | ElementOp::SelectOption { .. }
        )
    }
}

/// A locator plus the operation to run on it, evaluated in one step
#[derive(Debug, Clone, Serialize)]
pub struct Query<'a> {
    pub locator: &'a Locator,
    pub op: &'a ElementOp,
}

/// What the page reported for a [`Query`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResult {
    Count { value: usize },
    Visible { value: bool },
    Text { value: String },
    Attribute { value: Option<String> },
    /// The action ran
    Done,
    /// Nothing matched
    Missing,
    /// More than one element matched a locator that must be unique
    Ambiguous { count: usize },
    /// Matched but not rendered
    Hidden,
    /// Matched but disabled
    Disabled,
    /// The select does not offer the requested label
    NoSuchOption { available: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_match_modes() {
        assert!(TextMatch::exact("Motors").matches("  Motors \n").unwrap());
        assert!(!TextMatch::exact("Motors").matches("Motors for sale").unwrap());
        assert!(TextMatch::substring("for sale").matches("Property For  Sale").unwrap());
        assert!(TextMatch::pattern(r"Showing [\d,]+ results").matches("showing 1,234 results").unwrap());
        assert!(!TextMatch::pattern_cs("Listing #").matches("listing #1").unwrap());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(TextMatch::pattern("(unclosed").matches("x").is_err());
    }

    #[test]
    fn test_describe_reads_like_a_selector_chain() {
        let nav = Locator::label_exact("navigation bar");
        let sign_up = Locator::role(Role::Link).name_exact("Sign up").within(&nav);
        assert_eq!(
            sign_up.describe(),
            "label=\"navigation bar\" >> role=link[name=\"Sign up\"]"
        );

        let price = Locator::role(Role::Heading)
            .level(3)
            .has_text(TextMatch::pattern(r"Showing \d+ results"))
            .first();
        assert_eq!(
            price.to_string(),
            "role=heading[level=3] >> has-text=/Showing \\d+ results/i >> first"
        );
    }

    #[test]
    fn test_name_and_level_ignored_off_role() {
        let loc = Locator::css("a[href*=\"/listing/\"]").name_exact("x").level(2).last();
        assert_eq!(loc.selector, Selector::Css { css: "a[href*=\"/listing/\"]".to_string() });
        assert_eq!(loc.pick, Pick::Last);
    }

    #[test]
    fn test_wire_shape() {
        let loc = Locator::role(Role::Link).name_exact("Motors").first();
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["selector"]["kind"], "role");
        assert_eq!(json["selector"]["role"], "link");
        assert_eq!(json["selector"]["name"]["kind"], "exact");
        assert_eq!(json["pick"]["kind"], "first");
        assert!(json.get("scope").is_none());

        let result: QueryResult =
            serde_json::from_str(r#"{"status":"no_such_option","available":["Any make","Toyota"]}"#).unwrap();
        assert_eq!(
            result,
            QueryResult::NoSuchOption {
                available: vec!["Any make".to_string(), "Toyota".to_string()]
            }
        );
    }

    #[test]
    fn test_actions_are_classified() {
        assert!(ElementOp::Click.is_action());
        assert!(ElementOp::SelectOption { label: "Auckland".into() }.is_action());
        assert!(!ElementOp::Visible.is_action());
        assert!(!ElementOp::Attribute { name: "aria-label".into() }.is_action());
    }
}

//! Lazy element handles
//!
//! An `ElementHandle` is a page plus a locator. It holds no DOM node: every
//! probe and action resolves the locator again, so a re-rendered element is
//! picked up instead of going stale. Waits poll the live document on a fixed
//! interval until their budget runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::Timeouts;
use crate::locator::{ElementOp, Locator, QueryResult};
use crate::session::traits::{PageContext, WaitState};
use crate::{Error, Result};

/// A locator bound to a page
#[derive(Debug, Clone)]
pub struct ElementHandle {
    page: Arc<dyn PageContext>,
    locator: Locator,
    timeouts: Timeouts,
    slow_mo: Duration,
}

impl ElementHandle {
    pub fn new(page: Arc<dyn PageContext>, locator: Locator, timeouts: Timeouts, slow_mo: Duration) -> Self {
        Self {
            page,
            locator,
            timeouts,
            slow_mo,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn describe(&self) -> String {
        self.locator.describe()
    }

    /// Handle for `child` resolved inside this element
    pub fn child(&self, child: Locator) -> ElementHandle {
        ElementHandle {
            page: Arc::clone(&self.page),
            locator: self.locator.locator(child),
            timeouts: self.timeouts,
            slow_mo: self.slow_mo,
        }
    }

    async fn probe(&self, op: ElementOp) -> Result<QueryResult> {
        match self.page.query(&self.locator, &op).await? {
            QueryResult::Ambiguous { count } => Err(Error::ambiguous(self.describe(), count)),
            other => Ok(other),
        }
    }

    fn unexpected(&self, op: &str, result: QueryResult) -> Error {
        Error::internal(format!("{} on {} returned {:?}", op, self.describe(), result))
    }

    /// Number of elements the locator currently resolves to
    pub async fn count(&self) -> Result<usize> {
        match self.probe(ElementOp::Count).await? {
            QueryResult::Count { value } => Ok(value),
            other => Err(self.unexpected("count", other)),
        }
    }

    /// Whether the (single) match is rendered; false when nothing matches
    pub async fn is_visible(&self) -> Result<bool> {
        match self.probe(ElementOp::Visible).await? {
            QueryResult::Visible { value } => Ok(value),
            QueryResult::Missing => Ok(false),
            other => Err(self.unexpected("is_visible", other)),
        }
    }

    /// Raw text content, `None` when nothing matches
    pub async fn text_content(&self) -> Result<Option<String>> {
        match self.probe(ElementOp::Text).await? {
            QueryResult::Text { value } => Ok(Some(value)),
            QueryResult::Missing => Ok(None),
            other => Err(self.unexpected("text_content", other)),
        }
    }

    /// Attribute value, `None` when nothing matches or the attribute is absent
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let op = ElementOp::Attribute {
            name: name.to_string(),
        };
        match self.probe(op).await? {
            QueryResult::Attribute { value } => Ok(value),
            QueryResult::Missing => Ok(None),
            other => Err(self.unexpected("attribute", other)),
        }
    }

    /// Visible, whitespace-normalized text after waiting for the element
    pub async fn inner_text(&self, timeout: Duration) -> Result<String> {
        self.wait_for(WaitState::Visible, timeout).await?;
        let text = self.text_content().await?.unwrap_or_default();
        Ok(crate::locator::normalize_whitespace(&text))
    }

    async fn check(&self, state: WaitState) -> Result<bool> {
        match state {
            WaitState::Attached => Ok(self.count().await? > 0),
            WaitState::Visible => self.is_visible().await,
            WaitState::Hidden => Ok(!self.is_visible().await?),
        }
    }

    /// Poll until `state` holds or `timeout` elapses
    pub async fn wait_for(&self, state: WaitState, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            match self.check(state).await {
                Ok(true) => {
                    trace!("{} is {:?} after {:?}", self.describe(), state, start.elapsed());
                    return Ok(());
                }
                Ok(false) | Err(Error::StaleReference(_)) => {}
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                let what = match state {
                    WaitState::Attached => format!("{} to be attached", self.describe()),
                    WaitState::Visible => format!("{} to be visible", self.describe()),
                    WaitState::Hidden => format!("{} to be hidden", self.describe()),
                };
                return Err(Error::timeout(what, elapsed));
            }
            tokio::time::sleep(self.timeouts.poll_interval()).await;
        }
    }

    /// Bounded wait that reports presence instead of failing
    pub async fn is_visible_within(&self, timeout: Duration) -> Result<bool> {
        match self.wait_for(WaitState::Visible, timeout).await {
            Ok(()) => Ok(true),
            Err(Error::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resolve, check actionability and act in one step, retrying until the
    /// action budget runs out
    async fn act(&self, op: ElementOp) -> Result<()> {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }

        let budget = self.timeouts.action();
        let start = Instant::now();
        let mut last = QueryResult::Missing;

        loop {
            match self.page.query(&self.locator, &op).await {
                Ok(QueryResult::Done) => {
                    debug!("{:?} {}", op, self.describe());
                    return Ok(());
                }
                Ok(QueryResult::Ambiguous { count }) => {
                    return Err(Error::ambiguous(self.describe(), count))
                }
                Ok(other) => last = other,
                // the document was swapped mid-query; resolve again
                Err(Error::StaleReference(_)) => {}
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= budget {
                return Err(match (last, &op) {
                    (QueryResult::NoSuchOption { available }, ElementOp::SelectOption { label }) => {
                        Error::OptionNotFound {
                            element: self.describe(),
                            option: label.clone(),
                            available,
                        }
                    }
                    (QueryResult::Hidden, _) => {
                        Error::timeout(format!("{} to be visible", self.describe()), elapsed)
                    }
                    (QueryResult::Disabled, _) => {
                        Error::timeout(format!("{} to be enabled", self.describe()), elapsed)
                    }
                    _ => Error::timeout(self.describe(), elapsed),
                });
            }
            tokio::time::sleep(self.timeouts.poll_interval()).await;
        }
    }

    /// Click once the element is visible and enabled
    pub async fn click(&self) -> Result<()> {
        self.act(ElementOp::Click).await
    }

    /// Replace the value of a text control
    pub async fn fill(&self, value: &str) -> Result<()> {
        self.act(ElementOp::Fill {
            value: value.to_string(),
        })
        .await
    }

    /// Choose a `<select>` option by its visible label
    pub async fn select_option(&self, label: &str) -> Result<()> {
        self.act(ElementOp::SelectOption {
            label: label.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{Role, TextMatch};
    use crate::session::mock::{MockDocument, MockNode, MockPage, MockSite};

    fn fast() -> Timeouts {
        Timeouts {
            page_load_ms: 300,
            probe_ms: 300,
            action_ms: 300,
            scenario_ms: 2_000,
            poll_interval_ms: 10,
        }
    }

    async fn page(doc: MockDocument) -> Arc<MockPage> {
        let site = Arc::new(MockSite::new("https://mock.test").page("/", doc));
        let page = Arc::new(MockPage::new(site));
        page.navigate("https://mock.test/").await.unwrap();
        page
    }

    fn handle(page: &Arc<MockPage>, locator: Locator) -> ElementHandle {
        ElementHandle::new(page.clone(), locator, fast(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_probes_on_missing_element() {
        let page = page(MockDocument::new("Empty")).await;
        let h = handle(&page, Locator::role(Role::Button).name_exact("Search"));

        assert_eq!(h.count().await.unwrap(), 0);
        assert!(!h.is_visible().await.unwrap());
        assert_eq!(h.text_content().await.unwrap(), None);
        assert_eq!(h.attribute("aria-label").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wait_for_picks_up_late_render() {
        let doc = MockDocument::new("Results")
            .with(MockNode::heading(3, "Showing 42 results").appears_after(Duration::from_millis(50)));
        let page = page(doc).await;
        let h = handle(&page, Locator::role(Role::Heading).level(3));

        assert!(!h.is_visible().await.unwrap());
        h.wait_for(WaitState::Visible, Duration::from_millis(500)).await.unwrap();
        assert_eq!(h.inner_text(Duration::from_millis(50)).await.unwrap(), "Showing 42 results");
    }

    #[tokio::test]
    async fn test_wait_for_timeout_names_locator() {
        let page = page(MockDocument::new("Empty")).await;
        let h = handle(&page, Locator::text_exact("Listing #"));

        let err = h
            .wait_for(WaitState::Visible, Duration::from_millis(40))
            .await
            .unwrap_err();
        match err {
            Error::Timeout { element, elapsed } => {
                assert!(element.contains("text=\"Listing #\""));
                assert!(elapsed >= Duration::from_millis(40));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_click_waits_for_enabled_then_fails_with_timeout() {
        let doc = MockDocument::new("Form").with(MockNode::button("View listings").disabled());
        let page = page(doc).await;
        let h = handle(&page, Locator::role(Role::Button).name_exact("View listings"));

        let err = h.click().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("to be enabled"));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_ambiguous_action_fails_fast() {
        let doc = MockDocument::new("Form")
            .with(MockNode::button("Search"))
            .with(MockNode::button("Search"));
        let page = page(doc).await;
        let h = handle(&page, Locator::role(Role::Button).name_exact("Search"));

        let start = Instant::now();
        let err = h.click().await.unwrap_err();
        assert!(matches!(err, Error::AmbiguousMatch { count: 2, .. }));
        assert!(start.elapsed() < Duration::from_millis(300));

        h.child(Locator::text_exact("x")).count().await.unwrap();
        handle(&page, Locator::role(Role::Button).name_exact("Search").first())
            .click()
            .await
            .unwrap();
        assert_eq!(page.clicks(), vec!["Search".to_string()]);
    }

    #[tokio::test]
    async fn test_select_option_reports_available_labels() {
        let doc = MockDocument::new("Form").with(MockNode::select("Make", &["Any make", "Toyota"]));
        let page = page(doc).await;
        let h = handle(&page, Locator::label(TextMatch::exact("Make")));

        h.select_option("Toyota").await.unwrap();
        assert_eq!(page.selections(), vec![("Make".to_string(), "Toyota".to_string())]);

        match h.select_option("Tesla").await.unwrap_err() {
            Error::OptionNotFound { option, available, .. } => {
                assert_eq!(option, "Tesla");
                assert_eq!(available, vec!["Any make".to_string(), "Toyota".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_is_visible_within_turns_timeout_into_false() {
        let page = page(MockDocument::new("Empty")).await;
        let h = handle(&page, Locator::css("tm-vehicle-attributes"));
        assert!(!h.is_visible_within(Duration::from_millis(30)).await.unwrap());
    }
}

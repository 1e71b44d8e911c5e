//! Listing cards shared by every results page.
//!
//! The collection is never materialized: only its size and its last entry
//! are ever used.

use std::time::Duration;
use tracing::{debug, instrument};

use crate::locator::Locator;
use crate::session::{Session, WaitState};
use crate::{Error, Result};

/// Cards link to `/listing/` detail pages
pub const LISTING_SELECTOR: &str = r#"a[href*="/listing/"]"#;

#[derive(Debug, Clone)]
pub struct ListingCollection {
    session: Session,
}

impl ListingCollection {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn entries() -> Locator {
        Locator::css(LISTING_SELECTOR)
    }

    /// Wait until the first card is visible; `Error::NotFound` when none shows up
    pub async fn wait_for_any(&self, timeout: Duration) -> Result<()> {
        match self
            .session
            .locator(Self::entries().first())
            .wait_for(WaitState::Visible, timeout)
            .await
        {
            Err(Error::Timeout { elapsed, .. }) => Err(Error::not_found(
                format!("listing cards ({})", LISTING_SELECTOR),
                elapsed,
            )),
            other => other,
        }
    }

    /// Non-raising presence probe
    pub async fn has_any(&self, timeout: Duration) -> Result<bool> {
        match self.wait_for_any(timeout).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn count(&self) -> Result<usize> {
        self.session.locator(Self::entries()).count().await
    }

    /// Open the last card on the current page
    #[instrument(skip(self))]
    pub async fn open_last(&self) -> Result<()> {
        self.wait_for_any(self.session.timeouts().probe()).await?;
        debug!("Opening last of {} listing cards", self.count().await?);
        self.session.locator(Self::entries().last()).click().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::session::{BrowserContext, MockBrowser, MockDocument, MockNode, MockSite, PageOptions};

    fn timeouts() -> Timeouts {
        Timeouts {
            page_load_ms: 200,
            probe_ms: 150,
            action_ms: 200,
            scenario_ms: 1_000,
            poll_interval_ms: 10,
        }
    }

    async fn session_on(doc: MockDocument) -> Session {
        let site = MockSite::new("https://mock.test").page("/results", doc);
        let browser = MockBrowser::new(site);
        let page = browser.new_page(PageOptions::default()).await.unwrap();
        let session = Session::new(page, "https://mock.test", timeouts(), Duration::ZERO).unwrap();
        session.goto("/results").await.unwrap();
        session
    }

    fn cards(n: usize) -> MockDocument {
        MockDocument::new("Results")
            .with(MockNode::link("Saved searches", "/a/saved"))
            .with_all((1..=n).map(|i| MockNode::link(&format!("Listing {}", i), &format!("/a/listing/{}", i))))
    }

    #[tokio::test]
    async fn test_count_and_open_last() {
        let session = session_on(cards(3)).await;
        let listings = ListingCollection::new(session.clone());

        assert_eq!(listings.count().await.unwrap(), 3);
        assert!(listings.has_any(Duration::from_millis(50)).await.unwrap());

        listings.open_last().await.unwrap();
        assert_eq!(session.url().await.unwrap(), "https://mock.test/a/listing/3");
    }

    #[tokio::test]
    async fn test_empty_collection_is_not_found() {
        let session = session_on(cards(0)).await;
        let listings = ListingCollection::new(session);

        let err = listings.wait_for_any(Duration::from_millis(40)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("listing cards"));
        assert!(!listings.has_any(Duration::from_millis(40)).await.unwrap());

        let err = listings.open_last().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cards_rendered_late_are_waited_for() {
        let doc = MockDocument::new("Results")
            .with(MockNode::link("Late", "/a/listing/9").appears_after(Duration::from_millis(60)));
        let session = session_on(doc).await;
        let listings = ListingCollection::new(session.clone());

        listings.open_last().await.unwrap();
        assert!(session.url().await.unwrap().ends_with("/listing/9"));
    }
}

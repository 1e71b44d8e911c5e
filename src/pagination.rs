//! Pagination traversal
//!
//! Two results UIs paginate differently: motors shows a single "Last page"
//! control, property shows a numbered link list. Both sit behind
//! [`Pagination`], and [`go_to_last_page`] drives either one.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::components::ListingCollection;
use crate::config::Timeouts;
use crate::locator::{Locator, Role, TextMatch};
use crate::session::Session;
use crate::{Error, Result};

/// A results UI that can jump to its last page
#[async_trait]
pub trait Pagination: Send + Sync {
    /// Whether the results span more than one page
    async fn is_present(&self) -> Result<bool>;

    async fn is_on_last_page(&self) -> Result<bool>;

    /// Start navigating to the last page; does not wait for it
    async fn advance_to_last_page(&self) -> Result<()>;
}

/// What [`go_to_last_page`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
    NotPaginated,
    AlreadyLast,
    Advanced,
}

/// Wait for listings, move to the last page if not already there, and wait
/// for its listings. Calling it again on the last page does nothing.
#[instrument(skip_all)]
pub async fn go_to_last_page(
    listings: &ListingCollection,
    pagination: &dyn Pagination,
    timeouts: &Timeouts,
) -> Result<PageTurn> {
    listings.wait_for_any(timeouts.page_load()).await?;

    if !pagination.is_present().await? {
        debug!("Results fit on one page");
        return Ok(PageTurn::NotPaginated);
    }
    if pagination.is_on_last_page().await? {
        debug!("Already on the last page");
        return Ok(PageTurn::AlreadyLast);
    }

    pagination.advance_to_last_page().await?;

    let start = Instant::now();
    loop {
        match pagination.is_on_last_page().await {
            Ok(true) => break,
            Ok(false) | Err(Error::StaleReference(_)) => {}
            Err(e) => return Err(e),
        }
        let elapsed = start.elapsed();
        if elapsed >= timeouts.page_load() {
            return Err(Error::timeout("last page of results", elapsed));
        }
        tokio::time::sleep(timeouts.poll_interval()).await;
    }

    listings.wait_for_any(timeouts.page_load()).await?;
    info!("Reached last page of results");
    Ok(PageTurn::Advanced)
}

/// First run of digits in `text`
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// A single control labelled "Last page, page N"
#[derive(Debug, Clone)]
pub struct LastPageControl {
    session: Session,
}

impl LastPageControl {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn control() -> Locator {
        Locator::label(TextMatch::pattern_cs(r"Last page, page \d+")).first()
    }

    pub fn current_marker() -> Locator {
        Locator::css(r#"[aria-current="page"]"#).first()
    }

    /// N from the control's label
    pub async fn last_page_number(&self) -> Result<Option<u32>> {
        let label = self
            .session
            .locator(Self::control())
            .attribute("aria-label")
            .await?;
        Ok(label.as_deref().and_then(leading_number))
    }

    /// Current page from the `aria-current` marker, else the `page` query parameter, else 1
    pub async fn current_page(&self) -> Result<u32> {
        let marker = self.session.locator(Self::current_marker());
        if let Some(n) = marker.text_content().await?.as_deref().and_then(leading_number) {
            return Ok(n);
        }

        let url = self.session.url().await?;
        let from_query = Url::parse(&url).ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse().ok())
        });
        Ok(from_query.unwrap_or(1))
    }
}

#[async_trait]
impl Pagination for LastPageControl {
    /// The control is hidden on the last page, so a current page past 1 also counts
    async fn is_present(&self) -> Result<bool> {
        if self.session.locator(Self::control()).is_visible().await? {
            return Ok(true);
        }
        Ok(self.current_page().await? > 1)
    }

    async fn is_on_last_page(&self) -> Result<bool> {
        if !self.is_present().await? {
            return Ok(true);
        }
        let last = match self.last_page_number().await? {
            Some(last) => last,
            None => return Ok(true),
        };
        Ok(self.current_page().await? >= last)
    }

    async fn advance_to_last_page(&self) -> Result<()> {
        self.session.locator(Self::control()).click().await
    }
}

/// Numbered page links inside the "Pagination" navigation region
#[derive(Debug, Clone)]
pub struct NumberedLinks {
    session: Session,
}

impl NumberedLinks {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn region() -> Locator {
        Locator::role(Role::Navigation).name_exact("Pagination")
    }

    /// Last numbered link, skipping the Next/Previous text links
    pub fn last_link() -> Locator {
        Locator::role(Role::Link)
            .within(&Self::region())
            .has_not_text(TextMatch::pattern("next|previous"))
            .last()
    }

    pub fn current_link() -> Locator {
        Locator::role(Role::Link)
            .name_pattern("current page")
            .within(&Self::region())
            .first()
    }

    async fn link_text(&self, locator: Locator) -> Result<String> {
        let text = self.session.locator(locator).text_content().await?;
        Ok(text.map(|t| t.trim().to_string()).unwrap_or_default())
    }
}

#[async_trait]
impl Pagination for NumberedLinks {
    async fn is_present(&self) -> Result<bool> {
        self.session.locator(Self::region().first()).is_visible().await
    }

    async fn is_on_last_page(&self) -> Result<bool> {
        if !self.is_present().await? {
            return Ok(true);
        }
        let last = self.link_text(Self::last_link()).await?;
        if last.is_empty() {
            return Ok(true);
        }
        let current = self.link_text(Self::current_link()).await?;
        Ok(last == current)
    }

    async fn advance_to_last_page(&self) -> Result<()> {
        self.session.locator(Self::last_link()).click().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{BrowserContext, MockBrowser, MockDocument, MockNode, MockSite, PageOptions};
    use std::time::Duration;

    fn timeouts() -> Timeouts {
        Timeouts {
            page_load_ms: 300,
            probe_ms: 200,
            action_ms: 300,
            scenario_ms: 2_000,
            poll_interval_ms: 10,
        }
    }

    async fn session_on(site: MockSite, path: &str) -> Session {
        let browser = MockBrowser::new(site);
        let page = browser.new_page(PageOptions::default()).await.unwrap();
        let session = Session::new(page, "https://mock.test", timeouts(), Duration::ZERO).unwrap();
        session.goto(path).await.unwrap();
        session
    }

    fn cards(page: u32) -> Vec<MockNode> {
        (1..=3)
            .map(|i| MockNode::link(&format!("Car {}-{}", page, i), &format!("/a/motors/listing/{}{}", page, i)))
            .collect()
    }

    fn motors_page(current: u32, last: u32) -> MockDocument {
        let mut nav = MockNode::new("ul").child(MockNode::span(&current.to_string()).attr("aria-current", "page"));
        if current < last {
            nav = nav.child(
                MockNode::link(&last.to_string(), &format!("/cars?page={}", last))
                    .aria_label(&format!("Last page, page {}", last)),
            );
        }
        MockDocument::new("Cars").with_all(cards(current)).with(nav)
    }

    fn motors_site() -> MockSite {
        MockSite::new("https://mock.test")
            .page("/cars", motors_page(1, 4))
            .page("/cars?page=4", motors_page(4, 4))
            .page("/single", MockDocument::new("Cars").with_all(cards(1)))
            .page("/single-marked", motors_page(1, 1))
    }

    fn property_page(current: u32, last: u32) -> MockDocument {
        let mut nav = MockNode::nav("Pagination").child(MockNode::link("Previous", "/homes?page=1"));
        for n in 1..=last {
            let mut link = MockNode::link(&n.to_string(), &format!("/homes?page={}", n));
            if n == current {
                link = link.aria_label(&format!("{}, current page", n));
            }
            nav = nav.child(link);
        }
        nav = nav.child(MockNode::link("Next", &format!("/homes?page={}", (current + 1).min(last))));
        MockDocument::new("Homes").with_all(cards(current)).with(nav)
    }

    fn property_site() -> MockSite {
        MockSite::new("https://mock.test")
            .page("/homes", property_page(1, 3))
            .page("/homes?page=1", property_page(1, 3))
            .page("/homes?page=3", property_page(3, 3))
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("Last page, page 12"), Some(12));
        assert_eq!(leading_number("Page"), None);
    }

    #[tokio::test]
    async fn test_last_page_control_advances_once() {
        let session = session_on(motors_site(), "/cars").await;
        let listings = ListingCollection::new(session.clone());
        let pagination = LastPageControl::new(session.clone());

        assert_eq!(pagination.last_page_number().await.unwrap(), Some(4));
        assert_eq!(pagination.current_page().await.unwrap(), 1);

        let turn = go_to_last_page(&listings, &pagination, &timeouts()).await.unwrap();
        assert_eq!(turn, PageTurn::Advanced);
        assert_eq!(session.url().await.unwrap(), "https://mock.test/cars?page=4");

        // idempotent
        let again = go_to_last_page(&listings, &pagination, &timeouts()).await.unwrap();
        assert_eq!(again, PageTurn::AlreadyLast);
        assert_eq!(session.url().await.unwrap(), "https://mock.test/cars?page=4");
    }

    #[tokio::test]
    async fn test_single_page_is_not_paginated() {
        let session = session_on(motors_site(), "/single").await;
        let listings = ListingCollection::new(session.clone());
        let turn = go_to_last_page(&listings, &LastPageControl::new(session), &timeouts())
            .await
            .unwrap();
        assert_eq!(turn, PageTurn::NotPaginated);
    }

    #[tokio::test]
    async fn test_last_page_control_on_final_page() {
        let session = session_on(motors_site(), "/cars?page=4").await;
        let pagination = LastPageControl::new(session.clone());
        assert!(pagination.is_present().await.unwrap());
        assert!(pagination.is_on_last_page().await.unwrap());

        let marked = session_on(motors_site(), "/single-marked").await;
        let listings = ListingCollection::new(marked.clone());
        let turn = go_to_last_page(&listings, &LastPageControl::new(marked), &timeouts())
            .await
            .unwrap();
        assert_eq!(turn, PageTurn::NotPaginated);
    }

    #[tokio::test]
    async fn test_numbered_links_reach_last_page() {
        let session = session_on(property_site(), "/homes").await;
        let listings = ListingCollection::new(session.clone());
        let pagination = NumberedLinks::new(session.clone());

        assert!(pagination.is_present().await.unwrap());
        assert!(!pagination.is_on_last_page().await.unwrap());

        let turn = go_to_last_page(&listings, &pagination, &timeouts()).await.unwrap();
        assert_eq!(turn, PageTurn::Advanced);
        assert_eq!(session.url().await.unwrap(), "https://mock.test/homes?page=3");

        let again = go_to_last_page(&listings, &pagination, &timeouts()).await.unwrap();
        assert_eq!(again, PageTurn::AlreadyLast);
        assert_eq!(session.url().await.unwrap(), "https://mock.test/homes?page=3");
    }

    #[tokio::test]
    async fn test_no_listings_is_not_found() {
        let site = MockSite::new("https://mock.test").page("/empty", MockDocument::new("Empty"));
        let session = session_on(site, "/empty").await;
        let listings = ListingCollection::new(session.clone());

        let err = go_to_last_page(&listings, &NumberedLinks::new(session), &timeouts())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

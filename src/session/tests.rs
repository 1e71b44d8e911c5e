//! Session layer tests across browser, page and element handles

use std::time::Duration;

use crate::config::Timeouts;
use crate::locator::{Locator, Role, TextMatch};
use crate::session::{BrowserContext, MockBrowser, MockDocument, MockNode, MockSite, PageOptions, Session, WaitState};
use crate::Error;

fn timeouts() -> Timeouts {
    Timeouts {
        page_load_ms: 300,
        probe_ms: 300,
        action_ms: 300,
        scenario_ms: 2_000,
        poll_interval_ms: 10,
    }
}

fn site() -> MockSite {
    MockSite::new("https://mock.test")
        .page(
            "/",
            MockDocument::new("Home")
                .with(MockNode::heading(1, "Results").attr("data-version", "1"))
                .with(MockNode::link("Next", "/second")),
        )
        .page(
            "/second",
            MockDocument::new("Second")
                .with(MockNode::heading(1, "Results").attr("data-version", "2"))
                .with(MockNode::button("Later").appears_after(Duration::from_millis(40))),
        )
}

async fn open(browser: &MockBrowser) -> Session {
    let page = browser.new_page(PageOptions::default()).await.unwrap();
    Session::new(page, "https://mock.test", timeouts(), Duration::ZERO).unwrap()
}

#[tokio::test]
async fn test_handle_re_resolves_after_navigation() {
    let browser = MockBrowser::new(site());
    let session = open(&browser).await;
    session.goto("/").await.unwrap();

    let heading = session.locator(Locator::role(Role::Heading).level(1));
    assert_eq!(heading.attribute("data-version").await.unwrap().as_deref(), Some("1"));

    session
        .locator(Locator::role(Role::Link).name_exact("Next"))
        .click()
        .await
        .unwrap();
    session.expect_url("/second$").await.unwrap();

    // same handle, new document
    assert_eq!(heading.attribute("data-version").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_progressive_render_within_budget() {
    let browser = MockBrowser::new(site());
    let session = open(&browser).await;
    session.goto("/second").await.unwrap();

    let later = session.locator(Locator::role(Role::Button).name(TextMatch::substring("later")));
    later.wait_for(WaitState::Visible, session.timeouts().probe()).await.unwrap();
    later.click().await.unwrap();
}

#[tokio::test]
async fn test_sessions_do_not_share_pages() {
    let browser = MockBrowser::new(site());
    let a = open(&browser).await;
    let b = open(&browser).await;
    assert_ne!(a.id(), b.id());

    a.goto("/second").await.unwrap();
    b.goto("/").await.unwrap();
    assert_eq!(a.title().await.unwrap(), "Second");
    assert_eq!(b.title().await.unwrap(), "Home");

    a.close().await.unwrap();
    assert_eq!(browser.open_pages(), 1);
    assert!(matches!(a.title().await, Err(Error::PageClosed(_))));
    assert_eq!(b.title().await.unwrap(), "Home");

    browser.close().await.unwrap();
    assert_eq!(browser.open_pages(), 0);
}

#[tokio::test]
async fn test_unknown_path_serves_not_found_page() {
    let browser = MockBrowser::new(site());
    let session = open(&browser).await;
    session.goto("/nowhere").await.unwrap();
    assert_eq!(session.title().await.unwrap(), "Page not found");
    assert!(session.is_active());
}

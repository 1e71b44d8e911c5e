//! Scenario session handle
//!
//! One isolated page plus the site origin and wait budgets every page object
//! shares. Cloning is cheap; all clones drive the same page.

use regex::RegexBuilder;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::config::Timeouts;
use crate::locator::Locator;
use crate::session::element::ElementHandle;
use crate::session::traits::{LoadState, PageContext};
use crate::{Error, Result};

#[derive(Debug)]
struct SessionInner {
    page: Arc<dyn PageContext>,
    base_url: Url,
    timeouts: Timeouts,
    slow_mo: Duration,
}

/// Handle to one scenario's page
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(page: Arc<dyn PageContext>, base_url: &str, timeouts: Timeouts, slow_mo: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::configuration(format!("Invalid base URL {}: {}", base_url, e)))?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                page,
                base_url,
                timeouts,
                slow_mo,
            }),
        })
    }

    pub fn id(&self) -> &str {
        self.inner.page.id()
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.inner.timeouts
    }

    pub fn page(&self) -> &Arc<dyn PageContext> {
        &self.inner.page
    }

    /// Lazy handle for `locator` on this page
    pub fn locator(&self, locator: Locator) -> ElementHandle {
        ElementHandle::new(
            Arc::clone(&self.inner.page),
            locator,
            self.inner.timeouts,
            self.inner.slow_mo,
        )
    }

    /// Absolute URL for a path relative to the site origin
    pub fn resolve_url(&self, path: &str) -> Result<String> {
        self.inner
            .base_url
            .join(path)
            .map(|url| url.to_string())
            .map_err(|e| Error::navigation_failed(format!("Cannot resolve {}: {}", path, e)))
    }

    /// Navigate to a site-relative path and wait for the load event
    pub async fn goto(&self, path: &str) -> Result<()> {
        let url = self.resolve_url(path)?;
        info!("Navigating to {}", url);
        self.inner.page.navigate(&url).await?;
        self.wait_for_load(LoadState::Load).await
    }

    pub async fn wait_for_load(&self, state: LoadState) -> Result<()> {
        self.inner
            .page
            .wait_for_load_state(state, self.inner.timeouts.page_load())
            .await
    }

    pub async fn url(&self) -> Result<String> {
        self.inner.page.url().await
    }

    pub async fn title(&self) -> Result<String> {
        self.inner.page.title().await
    }

    /// Poll until the URL matches `pattern` (case-insensitive) within the page load budget
    pub async fn expect_url(&self, pattern: &str) -> Result<String> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::internal(format!("Invalid URL pattern /{}/: {}", pattern, e)))?;

        let budget = self.inner.timeouts.page_load();
        let start = Instant::now();
        loop {
            let url = match self.url().await {
                Ok(url) => url,
                Err(Error::StaleReference(_)) => String::new(),
                Err(e) => return Err(e),
            };
            if re.is_match(&url) {
                debug!("URL {} matches /{}/", url, pattern);
                return Ok(url);
            }
            if start.elapsed() >= budget {
                return Err(Error::assertion(format!(
                    "expected URL matching /{}/, got {}",
                    pattern, url
                )));
            }
            tokio::time::sleep(self.inner.timeouts.poll_interval()).await;
        }
    }

    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.page.press_key(key).await
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.inner.page.screenshot().await
    }

    pub fn is_active(&self) -> bool {
        self.inner.page.is_active()
    }

    /// Close the page; safe to call more than once
    pub async fn close(&self) -> Result<()> {
        self.inner.page.close().await
    }
}

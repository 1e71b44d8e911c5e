//! Session layer traits
//!
//! The seam between page objects and whatever renders the document: a real
//! CDP page target or the in-memory mock.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::locator::{ElementOp, Locator, QueryResult};
use crate::Error;

/// Page options for creating a new page
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl From<&Config> for PageOptions {
    fn from(config: &Config) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

/// Page load state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `load` fired: document.readyState is "complete"
    Load,
    /// DOM parsed: document.readyState is no longer "loading"
    DomContentLoaded,
    /// Loaded and no new resource requests for a quiet window
    NetworkIdle,
}

/// Element state a wait can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// At least one match exists
    Attached,
    /// The match is rendered
    Visible,
    /// No match is rendered
    Hidden,
}

/// One live page
#[async_trait]
pub trait PageContext: Send + Sync + std::fmt::Debug {
    /// Get page ID
    fn id(&self) -> &str;

    /// Start navigating to an absolute URL
    async fn navigate(&self, url: &str) -> Result<(), Error>;

    /// Wait until the document reaches `state`
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), Error>;

    /// Current document URL
    async fn url(&self) -> Result<String, Error>;

    /// Current document title
    async fn title(&self) -> Result<String, Error>;

    /// Resolve `locator` against the current document and run `op` in the same step
    async fn query(&self, locator: &Locator, op: &ElementOp) -> Result<QueryResult, Error>;

    /// Press and release a key on whatever has focus
    async fn press_key(&self, key: &str) -> Result<(), Error>;

    /// Capture a PNG screenshot
    async fn screenshot(&self) -> Result<Vec<u8>, Error>;

    /// Close the page and release its browser context
    async fn close(&self) -> Result<(), Error>;

    /// Check if page is still open
    fn is_active(&self) -> bool;
}

/// Source of fresh, isolated pages
#[async_trait]
pub trait BrowserContext: Send + Sync + std::fmt::Debug {
    /// Open a page that shares no cookies or storage with any other
    async fn new_page(&self, options: PageOptions) -> Result<Arc<dyn PageContext>, Error>;

    /// Close every page still open
    async fn close(&self) -> Result<(), Error>;
}

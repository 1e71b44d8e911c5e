//! Browser context implementation
//!
//! Hands out one isolated CDP target per page and tracks them until closed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cdp::traits::CdpBrowser;
use crate::session::page::PageContextImpl;
use crate::session::traits::{BrowserContext, PageContext, PageOptions};
use crate::Error;

/// Browser context implementation
#[derive(Debug)]
pub struct BrowserContextImpl {
    cdp_browser: Arc<dyn CdpBrowser>,
    poll_interval: Duration,
    pages: Arc<RwLock<HashMap<String, Arc<dyn PageContext>>>>,
}

impl BrowserContextImpl {
    /// Create a new browser context
    pub fn new(cdp_browser: Arc<dyn CdpBrowser>, poll_interval: Duration) -> Self {
        Self {
            cdp_browser,
            poll_interval,
            pages: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pages created here that are still open
    pub fn open_pages(&self) -> Result<usize, Error> {
        let pages = self
            .pages
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        Ok(pages.values().filter(|p| p.is_active()).count())
    }
}

#[async_trait]
impl BrowserContext for BrowserContextImpl {
    async fn new_page(&self, options: PageOptions) -> Result<Arc<dyn PageContext>, Error> {
        let target = self.cdp_browser.create_isolated_target("about:blank").await?;
        let cdp_client = match self.cdp_browser.create_client(&target).await {
            Ok(client) => client,
            Err(e) => {
                // the target exists already; do not leak it
                let _ = self.cdp_browser.dispose_target(&target).await;
                return Err(e);
            }
        };

        let page = Arc::new(PageContextImpl::new(
            target,
            Arc::clone(&self.cdp_browser),
            cdp_client.clone(),
            self.poll_interval,
        ));

        if let Err(e) = cdp_client
            .set_viewport(options.viewport_width, options.viewport_height)
            .await
        {
            let _ = page.close().await;
            return Err(e);
        }

        debug!(
            "Created page {} ({}x{})",
            page.id(),
            options.viewport_width,
            options.viewport_height
        );

        let mut pages = self
            .pages
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        pages.retain(|_, p| p.is_active());
        pages.insert(page.id().to_string(), page.clone());

        Ok(page)
    }

    async fn close(&self) -> Result<(), Error> {
        let pages: Vec<Arc<dyn PageContext>> = {
            let mut pages = self
                .pages
                .write()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            pages.drain().map(|(_, page)| page).collect()
        };

        for page in pages {
            if let Err(e) = page.close().await {
                warn!("Failed to close page {}: {}", page.id(), e);
            }
        }
        Ok(())
    }
}

//! Page context implementation
//!
//! A CDP page target in its own browser context. Locator queries are compiled
//! to a resolver script and evaluated in one `Runtime.evaluate` round trip.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cdp::traits::{CdpBrowser, CdpClient, EvaluationResult, TargetHandle};
use crate::locator::script::query_script;
use crate::locator::{ElementOp, Locator, Query, QueryResult};
use crate::session::traits::{LoadState, PageContext};
use crate::Error;

/// Snapshot of document readiness and resource activity
const LOAD_SNAPSHOT_SCRIPT: &str = r#"JSON.stringify({
    ready: document.readyState,
    resources: performance.getEntriesByType('resource').length
})"#;

/// Quiet window after which the network counts as idle
const NETWORK_QUIET: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct LoadSnapshot {
    ready: String,
    resources: usize,
}

/// Whether an evaluation error means the document was swapped out underneath us
fn is_context_loss(error: &Error) -> bool {
    let msg = match error {
        Error::ScriptExecutionFailed(msg) | Error::Cdp(msg) => msg,
        _ => return false,
    };
    msg.contains("Execution context was destroyed")
        || msg.contains("Cannot find context")
        || msg.contains("Inspected target navigated")
}

/// Page context implementation
#[derive(Debug)]
pub struct PageContextImpl {
    id: String,
    target: TargetHandle,
    cdp_browser: Arc<dyn CdpBrowser>,
    cdp_client: Arc<dyn CdpClient>,
    poll_interval: Duration,
    is_active: AtomicBool,
}

impl PageContextImpl {
    /// Create a new page context
    pub fn new(
        target: TargetHandle,
        cdp_browser: Arc<dyn CdpBrowser>,
        cdp_client: Arc<dyn CdpClient>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target,
            cdp_browser,
            cdp_client,
            poll_interval,
            is_active: AtomicBool::new(true),
        }
    }

    /// Target this page drives
    pub fn target(&self) -> &TargetHandle {
        &self.target
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::page_closed(&self.id))
        }
    }

    /// Evaluate a script expected to return a string
    async fn evaluate_string(&self, script: &str) -> Result<String, Error> {
        match self.cdp_client.evaluate(script, false).await {
            Ok(EvaluationResult::String(s)) => Ok(s),
            Ok(other) => Err(Error::cdp(format!("Expected a string, script returned {:?}", other))),
            Err(e) if is_context_loss(&e) => Err(Error::stale(format!("page {}: {}", self.id, e))),
            Err(e) => Err(e),
        }
    }

    async fn load_snapshot(&self) -> Result<LoadSnapshot, Error> {
        let raw = self.evaluate_string(LOAD_SNAPSHOT_SCRIPT).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl PageContext for PageContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_active()?;
        self.cdp_client.navigate(url).await?;
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), Error> {
        self.ensure_active()?;

        let start = Instant::now();
        let mut last_resources: Option<(usize, Instant)> = None;

        loop {
            match self.load_snapshot().await {
                Ok(snapshot) => {
                    let reached = match state {
                        LoadState::DomContentLoaded => snapshot.ready != "loading",
                        LoadState::Load => snapshot.ready == "complete",
                        LoadState::NetworkIdle if snapshot.ready == "complete" => {
                            match last_resources {
                                Some((count, since)) if count == snapshot.resources => {
                                    since.elapsed() >= NETWORK_QUIET
                                }
                                _ => {
                                    last_resources = Some((snapshot.resources, Instant::now()));
                                    false
                                }
                            }
                        }
                        LoadState::NetworkIdle => false,
                    };
                    if reached {
                        debug!("Page {} reached {:?} after {:?}", self.id, state, start.elapsed());
                        return Ok(());
                    }
                }
                // navigation still swapping documents
                Err(Error::StaleReference(_)) => last_resources = None,
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(Error::timeout(format!("load state {:?}", state), elapsed));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn url(&self) -> Result<String, Error> {
        self.ensure_active()?;
        self.evaluate_string("window.location.href").await
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_active()?;
        self.evaluate_string("document.title").await
    }

    async fn query(&self, locator: &Locator, op: &ElementOp) -> Result<QueryResult, Error> {
        self.ensure_active()?;

        let script = query_script(&Query { locator, op })?;
        let raw = self.evaluate_string(&script).await?;
        let result: QueryResult = serde_json::from_str(&raw)?;

        if op.is_action() {
            debug!("{:?} on {} -> {:?}", op, locator, result);
        }
        Ok(result)
    }

    async fn press_key(&self, key: &str) -> Result<(), Error> {
        self.ensure_active()?;
        self.cdp_client.press_key(key).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        self.ensure_active()?;
        self.cdp_client.screenshot().await
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing page {} (target {})", self.id, self.target.target_id);

        if let Err(e) = self.cdp_browser.dispose_target(&self.target).await {
            warn!("Failed to dispose target {}: {}", self.target.target_id, e);
            return Err(e);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

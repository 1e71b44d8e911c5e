//! CDP browser control implementation
//!
//! Browser-level operations: the HTTP discovery endpoints plus the browser
//! WebSocket, used to create one isolated browser context per page target.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use super::types::CreateTargetParams;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Remote debugging endpoint (e.g., "http://localhost:9222")
    endpoint: String,
    /// HTTP client for the discovery endpoints
    http: reqwest::Client,
    /// Browser-level connection, opened on first use
    browser_connection: Mutex<Option<Arc<CdpWebSocketConnection>>>,
    /// Active page connections (target_id -> connection)
    connections: Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
}

/// HTTP form of a debugging endpoint given as ws:// or http://
fn http_endpoint(endpoint: &str) -> String {
    endpoint
        .trim_end_matches('/')
        .replace("ws://", "http://")
        .replace("wss://", "https://")
}

/// Page-level WebSocket URL on the same host as the browser WebSocket
fn page_ws_url(browser_ws_url: &str, target_id: &str) -> Result<String, Error> {
    let mut url = url::Url::parse(browser_ws_url)
        .map_err(|e| Error::cdp(format!("Invalid browser WebSocket URL {}: {}", browser_ws_url, e)))?;
    url.set_path(&format!("/devtools/page/{}", target_id));
    Ok(url.to_string())
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Remote debugging endpoint (e.g., "http://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into();
        info!("Creating CDP browser controller for endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            browser_connection: Mutex::new(None),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint this controller talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Browser-level connection, connecting on first use
    async fn browser_connection(&self) -> Result<Arc<CdpWebSocketConnection>, Error> {
        let mut guard = self.browser_connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            if connection.is_active() {
                return Ok(Arc::clone(connection));
            }
        }

        let version = self.get_version().await?;
        let connection = CdpWebSocketConnection::new(version.ws_url).await?;
        *guard = Some(Arc::clone(&connection));
        Ok(connection)
    }

    async fn browser_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.browser_connection().await?.send_command(method, params).await?;
        response
            .result
            .ok_or_else(|| Error::cdp(format!("No result in {} response", method)))
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_isolated_target(&self, url: &str) -> Result<TargetHandle, Error> {
        info!("Creating isolated target for {}", url);

        let context = self
            .browser_call("Target.createBrowserContext", serde_json::json!({}))
            .await?;
        let browser_context_id = context
            .get("browserContextId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No browserContextId in Target.createBrowserContext result"))?
            .to_string();

        let params = CreateTargetParams {
            url: url.to_string(),
            browser_context_id: Some(browser_context_id.clone()),
        };
        let target = self
            .browser_call("Target.createTarget", serde_json::to_value(params)?)
            .await?;
        let target_id = target
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No targetId in Target.createTarget result"))?
            .to_string();

        let browser_ws = self.browser_connection().await?.url().to_string();
        let ws_url = page_ws_url(&browser_ws, &target_id)?;
        debug!("Target {} in context {} at {}", target_id, browser_context_id, ws_url);

        Ok(TargetHandle {
            target_id,
            browser_context_id: Some(browser_context_id),
            ws_url,
        })
    }

    async fn create_client(&self, target: &TargetHandle) -> Result<Arc<dyn CdpClient>, Error> {
        let connection = CdpWebSocketConnection::new(target.ws_url.as_str()).await?;

        self.connections
            .lock()
            .await
            .insert(target.target_id.clone(), Arc::clone(&connection) as Arc<dyn CdpConnection>);

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime cover navigation, evaluation and screenshots
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn dispose_target(&self, target: &TargetHandle) -> Result<(), Error> {
        info!("Disposing target {}", target.target_id);

        if let Some(connection) = self.connections.lock().await.remove(&target.target_id) {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target.target_id, e);
            }
        }

        self.browser_call(
            "Target.closeTarget",
            serde_json::json!({ "targetId": target.target_id }),
        )
        .await?;

        if let Some(context_id) = &target.browser_context_id {
            self.browser_call(
                "Target.disposeBrowserContext",
                serde_json::json!({ "browserContextId": context_id }),
            )
            .await?;
        }

        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let url = format!("{}/json/version", http_endpoint(&self.endpoint));
        debug!("Fetching browser version from {}", url);

        let version: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                Error::cdp(format!(
                    "Failed to reach Chrome at {} ({}). Start it with --remote-debugging-port=9222",
                    self.endpoint, e
                ))
            })?
            .json()
            .await?;

        let field = |name: &str| {
            version
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };

        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in /json/version"))?
            .to_string();

        Ok(BrowserVersion {
            protocol_version: field("Protocol-Version"),
            product: field("Browser"),
            user_agent: field("User-Agent"),
            ws_url,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        info!("Closing {} page connections", connections.len());

        for (target_id, connection) in connections.drain() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        if let Some(connection) = self.browser_connection.lock().await.take() {
            connection.close().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_conversion() {
        assert_eq!(http_endpoint("ws://localhost:9222"), "http://localhost:9222");
        assert_eq!(http_endpoint("wss://remote.example.com:9222/"), "https://remote.example.com:9222");
        assert_eq!(http_endpoint("http://127.0.0.1:9222"), "http://127.0.0.1:9222");
    }

    #[test]
    fn test_page_ws_url_reuses_browser_host() {
        let url = page_ws_url("ws://127.0.0.1:9222/devtools/browser/abc-123", "TARGET9").unwrap();
        assert_eq!(url, "ws://127.0.0.1:9222/devtools/page/TARGET9");
    }

    #[test]
    fn test_page_ws_url_rejects_garbage() {
        assert!(page_ws_url("not a url", "T").is_err());
    }
}

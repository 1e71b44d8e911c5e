//! Mock CDP implementation for testing
//!
//! Scriptable doubles for the CDP traits: canned results per method and a log
//! of every command sent.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::cdp::client::CdpClientImpl;
use crate::cdp::traits::*;
use crate::Error;

/// 1x1 transparent PNG
const BLANK_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: AtomicBool,
    next_id: AtomicU64,
    responses: Mutex<HashMap<String, Value>>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            responses: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answer every future `method` call with `result`
    pub fn respond(&self, method: &str, result: Value) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(method.to_string(), result);
        }
    }

    /// Every (method, params) pair sent so far
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn default_result(method: &str) -> Value {
        match method {
            "Page.navigate" => json!({ "frameId": "mock-frame", "loaderId": "mock-loader" }),
            "Runtime.evaluate" => json!({ "result": { "type": "string", "value": "complete" } }),
            "Page.captureScreenshot" => json!({ "data": BLANK_PNG }),
            _ => json!({}),
        }
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::websocket("Connection is not active"));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push((method.to_string(), params));
        }

        let result = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(method).cloned())
            .unwrap_or_else(|| Self::default_result(method));

        Ok(CdpResponse {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            result: Some(result),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock CDP browser
///
/// Hands out isolated targets backed by [`MockCdpConnection`]s and remembers
/// which ones were disposed.
#[derive(Debug, Default)]
pub struct MockCdpBrowser {
    next_target: AtomicU64,
    connections: Mutex<HashMap<String, Arc<MockCdpConnection>>>,
    disposed: Mutex<Vec<String>>,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection behind a target, for asserting on the commands it received
    pub fn connection(&self, target_id: &str) -> Option<Arc<MockCdpConnection>> {
        self.connections.lock().ok()?.get(target_id).cloned()
    }

    /// Target IDs disposed so far
    pub fn disposed(&self) -> Vec<String> {
        self.disposed.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_isolated_target(&self, _url: &str) -> Result<TargetHandle, Error> {
        let n = self.next_target.fetch_add(1, Ordering::Relaxed);
        let target_id = format!("target-{}", n);
        Ok(TargetHandle {
            ws_url: format!("ws://mock/devtools/page/{}", target_id),
            browser_context_id: Some(format!("context-{}", n)),
            target_id,
        })
    }

    async fn create_client(&self, target: &TargetHandle) -> Result<Arc<dyn CdpClient>, Error> {
        let connection = Arc::new(MockCdpConnection::new());
        self.connections
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .insert(target.target_id.clone(), Arc::clone(&connection));
        Ok(Arc::new(CdpClientImpl::new(connection)))
    }

    async fn dispose_target(&self, target: &TargetHandle) -> Result<(), Error> {
        self.disposed
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .push(target.target_id.clone());
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "MockChrome/1.0".to_string(),
            user_agent: "Mozilla/5.0 (Mock)".to_string(),
            ws_url: "ws://mock/devtools/browser/mock".to_string(),
        })
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

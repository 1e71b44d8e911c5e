//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::{debug, info};

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

/// Key identifiers understood by `press_key`
fn key_definition(key: &str) -> Option<(&'static str, u32)> {
    match key {
        "Escape" => Some(("Escape", 27)),
        "Enter" => Some(("Enter", 13)),
        "Tab" => Some(("Tab", 9)),
        "ArrowDown" => Some(("ArrowDown", 40)),
        "ArrowUp" => Some(("ArrowUp", 38)),
        _ => None,
    }
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        let value = obj.value.as_ref();
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                value.and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            ),
            "number" => EvaluationResult::Number(value.and_then(|v| v.as_f64()).unwrap_or(0.0)),
            "boolean" => EvaluationResult::Bool(value.and_then(|v| v.as_bool()).unwrap_or(false)),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" => EvaluationResult::Object(value.cloned().unwrap_or(serde_json::Value::Null)),
            other => {
                debug!("parse_remote_object: '{}' has no by-value form, returning Null", other);
                EvaluationResult::Null
            }
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };
        let result = self.call_method("Page.navigate", serde_json::to_value(params)?).await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
        }

        Ok(NavigationResult {
            frame_id: result.get("frameId").and_then(|v| v.as_str()).map(str::to_string),
            loader_id: result.get("loaderId").and_then(|v| v.as_str()).map(str::to_string),
            url: url.to_string(),
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
            user_gesture: Some(true),
        };

        let result = self.call_method("Runtime.evaluate", serde_json::to_value(params)?).await?;

        // CDP response structure: {"result": {...}, "exceptionDetails": {...}}
        let response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse EvaluateResponse: {}", e)))?;

        if let Some(exception) = response.exception_details {
            return Err(Error::script_execution_failed(exception.describe()));
        }

        Ok(Self::parse_remote_object(&response.result))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        info!("Capturing screenshot");

        let result = self
            .call_method("Page.captureScreenshot", serde_json::json!({ "format": "png" }))
            .await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn press_key(&self, key: &str) -> Result<(), Error> {
        let (code, key_code) =
            key_definition(key).ok_or_else(|| Error::cdp(format!("Unsupported key: {}", key)))?;
        debug!("Pressing key {}", key);

        for phase in ["keyDown", "keyUp"] {
            let params = KeyEventParams {
                r#type: phase.to_string(),
                key: key.to_string(),
                code: code.to_string(),
                windows_virtual_key_code: key_code,
            };
            self.call_method("Input.dispatchKeyEvent", serde_json::to_value(params)?)
                .await?;
        }

        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), Error> {
        let params = DeviceMetricsParams {
            width,
            height,
            device_scale_factor: 1.0,
            mobile: false,
        };
        self.call_method("Emulation.setDeviceMetricsOverride", serde_json::to_value(params)?)
            .await?;
        Ok(())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        response
            .result
            .ok_or_else(|| Error::cdp(format!("No result in {} response", method)))
    }
}

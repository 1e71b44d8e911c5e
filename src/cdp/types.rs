//! CDP (Chrome DevTools Protocol) type definitions
//!
//! Wire shapes for the handful of CDP domains the harness drives.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Session ID for flattened target sessions
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Anything the browser sends back: a response carries `id`, an event carries `method`
#[derive(Debug, Clone, Deserialize)]
pub struct CdpIncoming {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
    /// Referrer URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Treat the evaluation as a user gesture so click handlers behave as for real input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// Exception details
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception text
    #[serde(default)]
    pub text: Option<String>,
    /// Line number
    #[serde(default)]
    pub line_number: i32,
    /// Exception object
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Most specific human-readable description available
    pub fn describe(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .or_else(|| self.text.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation failed
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

/// Keyboard event parameters for `Input.dispatchKeyEvent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    /// keyDown / keyUp
    pub r#type: String,
    pub key: String,
    pub code: String,
    pub windows_virtual_key_code: u32,
}

/// Viewport override for `Emulation.setDeviceMetricsOverride`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetricsParams {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

/// `Target.createTarget` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialization() {
        let request = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({ "url": "https://www.trademe.co.nz/" })),
            session_id: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_incoming_response_and_event() {
        let response: CdpIncoming =
            serde_json::from_str(r#"{"id":7,"result":{"frameId":"F"}}"#).unwrap();
        assert_eq!(response.id, Some(7));
        assert!(response.method.is_none());

        let event: CdpIncoming =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{"timestamp":1.5}}"#)
                .unwrap();
        assert_eq!(event.id, None);
        assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));
    }

    #[test]
    fn test_evaluate_params_use_protocol_names() {
        let params = EvaluateParams {
            expression: "1 + 1".to_string(),
            await_promise: Some(false),
            return_by_value: Some(true),
            user_gesture: None,
        };

        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["returnByValue"], true);
        assert_eq!(json["awaitPromise"], false);
        assert!(json.get("userGesture").is_none());
    }

    #[test]
    fn test_exception_description_prefers_exception_object() {
        let response: EvaluateResponse = serde_json::from_str(
            r#"{"result":{"type":"object"},"exceptionDetails":{"text":"Uncaught","lineNumber":3,
                "exception":{"type":"object","description":"TypeError: x is undefined"}}}"#,
        )
        .unwrap();

        let details = response.exception_details.unwrap();
        assert_eq!(details.line_number, 3);
        assert_eq!(details.describe(), "TypeError: x is undefined");
    }
}

//! Per-scenario diagnostic sink.
//!
//! Events are appended to the scenario's report and mirrored to `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::scenario::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Skip,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warn => "warn",
            DiagnosticLevel::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub scenario: String,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticEvent {
    /// Message followed by the compact JSON payload
    pub fn rendered(&self) -> String {
        match &self.payload {
            Some(payload) => format!("{} {}", self.message, payload),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str().to_uppercase(), self.rendered())
    }
}

/// Cheap to clone; clones share one event list
#[derive(Debug, Clone)]
pub struct Diagnostics {
    scenario: String,
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl Diagnostics {
    pub fn new<S: Into<String>>(scenario: S) -> Self {
        Self {
            scenario: scenario.into(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn record<S: Into<String>>(&self, level: DiagnosticLevel, message: S, payload: Option<Value>) {
        let event = DiagnosticEvent {
            level,
            message: message.into(),
            payload,
            scenario: self.scenario.clone(),
            timestamp: Utc::now(),
        };

        let rendered = event.rendered();
        match level {
            DiagnosticLevel::Info => info!(scenario = %self.scenario, kind = "info", "{}", rendered),
            DiagnosticLevel::Warn => warn!(scenario = %self.scenario, kind = "warn", "{}", rendered),
            DiagnosticLevel::Skip => info!(scenario = %self.scenario, kind = "skip", "SKIP {}", rendered),
        }

        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn info<S: Into<String>>(&self, message: S, payload: Option<Value>) {
        self.record(DiagnosticLevel::Info, message, payload);
    }

    pub fn warn<S: Into<String>>(&self, message: S, payload: Option<Value>) {
        self.record(DiagnosticLevel::Warn, message, payload);
    }

    /// Record the skip and hand back the early-termination outcome
    pub fn skip<S: Into<String>>(&self, reason: S, payload: Option<Value>) -> Outcome {
        let reason = reason.into();
        self.record(DiagnosticLevel::Skip, reason.clone(), payload);
        Outcome::Skipped { reason }
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_are_appended_in_order() {
        let diagnostics = Diagnostics::new("TC-1");
        diagnostics.info("navigated", None);
        diagnostics.warn("slow caption", Some(json!({"ms": 900})));

        let events = diagnostics.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, DiagnosticLevel::Info);
        assert_eq!(events[1].level, DiagnosticLevel::Warn);
        assert!(events.iter().all(|e| e.scenario == "TC-1"));
    }

    #[test]
    fn test_rendered_entry_appends_compact_payload() {
        let diagnostics = Diagnostics::new("TC-2");
        diagnostics.info("filters", Some(json!({"make": "Any make"})));

        let event = &diagnostics.events()[0];
        assert_eq!(event.rendered(), r#"filters {"make":"Any make"}"#);
        assert_eq!(event.to_string(), r#"[INFO] filters {"make":"Any make"}"#);
    }

    #[test]
    fn test_skip_returns_skipped_outcome() {
        let diagnostics = Diagnostics::new("TC-3");
        let outcome = diagnostics.skip("No results", Some(json!({"location": "Auckland"})));

        assert_eq!(outcome, Outcome::Skipped { reason: "No results".into() });
        let event = &diagnostics.events()[0];
        assert_eq!(event.level, DiagnosticLevel::Skip);
        assert_eq!(event.payload.as_ref().unwrap()["location"], "Auckland");
    }

    #[test]
    fn test_clones_share_events() {
        let diagnostics = Diagnostics::new("TC-4");
        let clone = diagnostics.clone();
        clone.info("from clone", None);
        assert_eq!(diagnostics.events().len(), 1);
    }

    #[test]
    fn test_event_serializes_lowercase_level() {
        let diagnostics = Diagnostics::new("TC-5");
        diagnostics.skip("empty", None);
        let value = serde_json::to_value(&diagnostics.events()[0]).unwrap();
        assert_eq!(value["level"], "skip");
        assert!(value.get("payload").is_none());
    }
}

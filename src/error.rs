//! Unified error types for chaser-probe

use std::time::Duration;
use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for chaser-probe
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// HTTP errors talking to the browser endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An awaited element never satisfied its condition
    #[error("Timed out after {}ms waiting for {element}", elapsed.as_millis())]
    Timeout { element: String, elapsed: Duration },

    /// A collection probe found nothing within its budget
    #[error("Nothing matched {element} within {}ms", elapsed.as_millis())]
    NotFound { element: String, elapsed: Duration },

    /// A locator resolved to more than one element where exactly one was required
    #[error("{element} matched {count} elements; narrow the locator")]
    AmbiguousMatch { element: String, count: usize },

    /// The element was replaced or its page went away between resolution and action
    #[error("Stale reference: {0}")]
    StaleReference(String),

    /// A select or picker does not render the requested option label
    #[error("Option {option:?} not offered by {element} (available: {available:?})")]
    OptionNotFound {
        element: String,
        option: String,
        available: Vec<String>,
    },

    /// An expectation on the rendered document failed
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// A scenario step failed
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Page is closed
    #[error("Page closed: {0}")]
    PageClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fixture data error
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(element: S, elapsed: Duration) -> Self {
        Error::Timeout {
            element: element.into(),
            elapsed,
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(element: S, elapsed: Duration) -> Self {
        Error::NotFound {
            element: element.into(),
            elapsed,
        }
    }

    /// Create a new ambiguous match error
    pub fn ambiguous<S: Into<String>>(element: S, count: usize) -> Self {
        Error::AmbiguousMatch {
            element: element.into(),
            count,
        }
    }

    /// Create a new stale reference error
    pub fn stale<S: Into<String>>(msg: S) -> Self {
        Error::StaleReference(msg.into())
    }

    /// Create a new assertion error
    pub fn assertion<S: Into<String>>(msg: S) -> Self {
        Error::Assertion(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new page closed error
    pub fn page_closed<S: Into<String>>(id: S) -> Self {
        Error::PageClosed(id.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new fixture error
    pub fn fixture<S: Into<String>>(msg: S) -> Self {
        Error::Fixture(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Attach the name of the scenario step that raised this error
    pub fn in_step<S: Into<String>>(self, step: S) -> Self {
        Error::StepFailed {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is the recoverable "collection stayed empty" condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::StepFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether an awaited condition ran out of time
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::NotFound { .. } => true,
            Error::StepFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Name of the failing step, if the error was raised inside one
    pub fn step(&self) -> Option<&str> {
        match self {
            Error::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}

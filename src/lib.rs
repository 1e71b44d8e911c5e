//! chaser-probe: page-object UI verification harness over Chrome DevTools Protocol
//!
//! Scenarios drive marketplace search flows through page objects and
//! components; locators resolve lazily against the live document behind
//! bounded waits.

pub mod error;
pub mod config;

pub mod cdp;
pub mod session;
pub mod locator;
pub mod components;
pub mod pages;
pub mod pagination;

pub mod data;
pub mod diagnostics;
pub mod scenario;
pub mod fixture;
pub mod scenarios;
pub mod runner;

// Re-exports
pub use error::{Error, Result};

/// chaser-probe library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

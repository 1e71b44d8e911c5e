//! Structural checks for listing detail pages.

use std::time::Duration;
use tracing::{debug, info};

use crate::locator::Locator;
use crate::session::{Session, WaitState};
use crate::{Error, Result};

/// Whether an element must render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be visible; failure raises
    Required,
    /// Checked only if already rendered; absence never raises
    Conditional,
}

/// One element a detail page is expected to show
#[derive(Debug, Clone)]
pub struct ElementCheck {
    pub name: &'static str,
    pub locator: Locator,
    pub presence: Presence,
    /// Rendered text must be non-empty
    pub non_empty: bool,
}

impl ElementCheck {
    pub fn required(name: &'static str, locator: Locator) -> Self {
        Self {
            name,
            locator,
            presence: Presence::Required,
            non_empty: false,
        }
    }

    pub fn conditional(name: &'static str, locator: Locator) -> Self {
        Self {
            name,
            locator,
            presence: Presence::Conditional,
            non_empty: false,
        }
    }

    pub fn with_text(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

/// What a validation pass saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Elements found visible
    pub present: Vec<&'static str>,
    /// Conditional elements that were not rendered
    pub absent: Vec<&'static str>,
}

/// Check every element in order; the first missing required element fails the pass
pub async fn validate_elements(session: &Session, checks: &[ElementCheck], budget: Duration) -> Result<Validation> {
    let mut validation = Validation::default();

    for check in checks {
        let handle = session.locator(check.locator.clone());
        match check.presence {
            Presence::Required => {
                handle
                    .wait_for(WaitState::Visible, budget)
                    .await
                    .map_err(|e| match e {
                        Error::Timeout { element, elapsed } => {
                            Error::timeout(format!("{} ({})", check.name, element), elapsed)
                        }
                        other => other,
                    })?;
            }
            Presence::Conditional => {
                if !handle.is_visible().await? {
                    debug!("Optional element {} not rendered", check.name);
                    validation.absent.push(check.name);
                    continue;
                }
            }
        }

        if check.non_empty {
            let text = handle.text_content().await?.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(Error::assertion(format!("{} is empty ({})", check.name, check.locator)));
            }
        }
        validation.present.push(check.name);
    }

    info!(
        "Validated {} elements ({} optional absent)",
        validation.present.len(),
        validation.absent.len()
    );
    Ok(validation)
}

//! Scenario model: outcomes, verdicts, reports and the search-flow state machine.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::pagination::PageTurn;
use crate::{Error, Result};

/// Name and classification tags of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub tags: Vec<String>,
}

impl ScenarioInfo {
    pub fn new<S: Into<String>>(name: S, tags: &[&str]) -> Self {
        Self {
            name: name.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Tags compare without the leading `@`
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim_start_matches('@');
        self.tags.iter().any(|t| t.trim_start_matches('@').eq_ignore_ascii_case(wanted))
    }
}

/// How a scenario body that did not raise ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Skipped {
        reason: String,
    },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<String>,
        error: String,
    },
}

impl Verdict {
    pub fn failed(error: &Error) -> Self {
        Verdict::Failed {
            step: error.step().map(str::to_string),
            error: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASS",
            Verdict::Skipped { .. } => "SKIP",
            Verdict::Failed { .. } => "FAIL",
        }
    }
}

impl From<Outcome> for Verdict {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => Verdict::Passed,
            Outcome::Skipped { reason } => Verdict::Skipped { reason },
        }
    }
}

impl From<&Result<Outcome>> for Verdict {
    fn from(result: &Result<Outcome>) -> Self {
        match result {
            Ok(outcome) => outcome.clone().into(),
            Err(e) => Verdict::failed(e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub tags: Vec<String>,
    pub verdict: Verdict,
    pub events: Vec<DiagnosticEvent>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

tokio::task_local! {
    static ACTIVE_STEP: StepTracker;
}

/// Innermost step still running inside a scope
///
/// Survives the scope's future being dropped, so a timeout around the
/// scope can still name the step it interrupted.
#[derive(Debug, Clone, Default)]
pub struct StepTracker(Arc<Mutex<Option<String>>>);

impl StepTracker {
    pub fn current(&self) -> Option<String> {
        self.0.lock().ok().and_then(|step| step.clone())
    }

    fn replace(&self, step: Option<String>) -> Option<String> {
        match self.0.lock() {
            Ok(mut current) => std::mem::replace(&mut *current, step),
            Err(_) => None,
        }
    }

    /// Run `fut` with [`step`] calls reporting into this tracker
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        ACTIVE_STEP.scope(self.clone(), fut).await
    }
}

/// Run `fut` as a named step; errors carry the step name
pub async fn step<T, F>(name: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!("Step: {}", name);
    let outer = ACTIVE_STEP.try_with(|t| t.replace(Some(name.to_string()))).ok();
    let result = fut.instrument(info_span!("step", step = name)).await;
    if let Some(outer) = outer {
        let _ = ACTIVE_STEP.try_with(|t| t.replace(outer));
    }
    result.map_err(|e| e.in_step(name))
}

/// States of a filtered search flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowState {
    Init,
    NavigatedToSection,
    FiltersApplied,
    Submitted,
    ResultsEmpty,
    ResultsNonEmpty,
    LastPageReached,
    DetailOpened,
    Validated,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::ResultsEmpty | FlowState::Validated | FlowState::Failed)
    }

    pub fn can_transition_to(&self, next: FlowState) -> bool {
        use FlowState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Init, NavigatedToSection)
            | (NavigatedToSection, FiltersApplied)
            | (FiltersApplied, Submitted)
            | (Submitted, ResultsEmpty)
            | (Submitted, ResultsNonEmpty)
            | (ResultsNonEmpty, LastPageReached)
            | (LastPageReached, DetailOpened)
            | (DetailOpened, Validated) => true,
            _ => false,
        }
    }
}

/// Tracks the current state and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct SearchFlow {
    state: FlowState,
    history: Vec<FlowState>,
}

impl Default for SearchFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Init,
            history: vec![FlowState::Init],
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    pub fn advance(&mut self, next: FlowState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::internal(format!(
                "illegal flow transition {:?} -> {:?}",
                self.state, next
            )));
        }
        debug!("Flow {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` unless already terminal
    pub fn fail(&mut self) {
        if self.state.can_transition_to(FlowState::Failed) {
            self.state = FlowState::Failed;
            self.history.push(FlowState::Failed);
        }
    }
}

/// A marketplace section with a filter form, paginated results and a detail page
#[async_trait]
pub trait SearchSection: Send + Sync {
    /// Section name used in diagnostics
    fn name(&self) -> &str;

    /// Filter combination logged with the skip event
    fn filters(&self) -> Value;

    async fn navigate(&self) -> Result<()>;

    async fn apply_filters(&self) -> Result<()>;

    async fn submit(&self) -> Result<()>;

    async fn result_count(&self) -> Result<u64>;

    async fn go_to_last_page(&self) -> Result<PageTurn>;

    /// Open the last listing and wait for its detail page
    async fn open_last_listing(&self) -> Result<()>;

    async fn validate_detail(&self, diagnostics: &Diagnostics) -> Result<()>;
}

/// Drive `section` through the search flow.
///
/// Zero results end in `Outcome::Skipped` with the filters as payload.
pub async fn run_search_flow(section: &dyn SearchSection, diagnostics: &Diagnostics) -> Result<Outcome> {
    let mut flow = SearchFlow::new();
    let result = drive(section, diagnostics, &mut flow).await;
    if result.is_err() {
        flow.fail();
    }
    debug!("Search flow ended in {:?}", flow.state());
    result
}

async fn drive(section: &dyn SearchSection, diagnostics: &Diagnostics, flow: &mut SearchFlow) -> Result<Outcome> {
    step("navigate to section", section.navigate()).await?;
    flow.advance(FlowState::NavigatedToSection)?;

    step("apply filters", section.apply_filters()).await?;
    flow.advance(FlowState::FiltersApplied)?;
    diagnostics.info(format!("Applied {} filters", section.name()), Some(section.filters()));

    step("submit search", section.submit()).await?;
    flow.advance(FlowState::Submitted)?;

    let count = step("read result count", section.result_count()).await?;
    if count == 0 {
        flow.advance(FlowState::ResultsEmpty)?;
        return Ok(diagnostics.skip(
            format!("No {} listings match the filters", section.name()),
            Some(section.filters()),
        ));
    }
    flow.advance(FlowState::ResultsNonEmpty)?;
    diagnostics.info(format!("{} results", count), Some(json!({ "count": count })));

    let turn = step("go to last page", section.go_to_last_page()).await?;
    flow.advance(FlowState::LastPageReached)?;
    diagnostics.info(format!("Pagination: {:?}", turn), None);

    step("open last listing", section.open_last_listing()).await?;
    flow.advance(FlowState::DetailOpened)?;

    step("validate detail page", section.validate_detail(diagnostics)).await?;
    flow.advance(FlowState::Validated)?;

    Ok(Outcome::Passed)
}

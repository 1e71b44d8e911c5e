//! Per-scenario provisioning.
//!
//! [`Provisioner::run`] opens one isolated page, builds every page object on
//! top of it, runs the scenario body under the scenario ceiling and always
//! closes the page afterwards.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::pages::{
    HomePage, JobsSearchPage, MotorsDetailPage, MotorsResultsPage, MotorsSearchPage, PropertyDetailPage,
    PropertyResultsPage, PropertySearchPage,
};
use crate::scenario::{Outcome, ScenarioInfo, ScenarioReport, StepTracker, Verdict};
use crate::session::{BrowserContext, PageOptions, Session};
use crate::{Error, Result};

/// One instance of every page object, all bound to the same session
#[derive(Debug, Clone)]
pub struct PageBundle {
    pub session: Session,
    pub home: HomePage,
    pub motors_search: MotorsSearchPage,
    pub motors_results: MotorsResultsPage,
    pub motors_detail: MotorsDetailPage,
    pub property_search: PropertySearchPage,
    pub property_results: PropertyResultsPage,
    pub property_detail: PropertyDetailPage,
    pub jobs_search: JobsSearchPage,
}

impl PageBundle {
    pub fn new(session: Session) -> Self {
        Self {
            home: HomePage::new(session.clone()),
            motors_search: MotorsSearchPage::new(session.clone()),
            motors_results: MotorsResultsPage::new(session.clone()),
            motors_detail: MotorsDetailPage::new(session.clone()),
            property_search: PropertySearchPage::new(session.clone()),
            property_results: PropertyResultsPage::new(session.clone()),
            property_detail: PropertyDetailPage::new(session.clone()),
            jobs_search: JobsSearchPage::new(session.clone()),
            session,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provisioner {
    browser: Arc<dyn BrowserContext>,
    config: Arc<Config>,
}

impl Provisioner {
    pub fn new(browser: Arc<dyn BrowserContext>, config: Arc<Config>) -> Self {
        Self { browser, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a fresh page and build the bundle; the caller closes the session
    pub async fn provision(&self) -> Result<(Session, PageBundle)> {
        let page = self.browser.new_page(PageOptions::from(&*self.config)).await?;
        let session = match Session::new(
            page.clone(),
            &self.config.base_url,
            self.config.timeouts,
            Duration::from_millis(self.config.slow_mo_ms),
        ) {
            Ok(session) => session,
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    warn!("Failed to close page after provisioning error: {}", close_err);
                }
                return Err(e);
            }
        };
        Ok((session.clone(), PageBundle::new(session)))
    }

    /// Run one scenario body with guaranteed teardown
    pub async fn run<F, Fut>(&self, info: &ScenarioInfo, body: F) -> ScenarioReport
    where
        F: FnOnce(PageBundle, Diagnostics) -> Fut,
        Fut: Future<Output = Result<Outcome>>,
    {
        let start = Instant::now();
        let diagnostics = Diagnostics::new(info.name.clone());
        info!(scenario = %info.name, "Starting scenario");

        let (session, bundle) = match self.provision().await {
            Ok(provisioned) => provisioned,
            Err(e) => {
                let e = e.in_step("provision session");
                error!(scenario = %info.name, "{}", e);
                return self.report(info, &diagnostics, Err(e), start, None);
            }
        };

        let budget = self.config.timeouts.scenario();
        let steps = StepTracker::default();
        let body = AssertUnwindSafe(steps.scope(body(bundle, diagnostics.clone()))).catch_unwind();
        let result = match tokio::time::timeout(budget, body).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(Error::internal(format!(
                "scenario panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => {
                let e = Error::timeout(format!("scenario {}", info.name), budget);
                Err(match steps.current() {
                    Some(step) => e.in_step(step),
                    None => e,
                })
            }
        };

        let mut screenshot = None;
        if let Err(e) = &result {
            error!(scenario = %info.name, "{}", e);
            if self.config.screenshot_on_failure {
                screenshot = self.capture(&session, &info.name).await;
            }
        }

        if let Err(e) = session.close().await {
            warn!(scenario = %info.name, "Failed to close session: {}", e);
        }

        self.report(info, &diagnostics, result, start, screenshot)
    }

    async fn capture(&self, session: &Session, name: &str) -> Option<PathBuf> {
        if !session.is_active() {
            return None;
        }
        let path = screenshot_path(&self.config.artifacts_dir, name);
        let written = async {
            let png = session.screenshot().await?;
            tokio::fs::create_dir_all(&self.config.artifacts_dir).await?;
            tokio::fs::write(&path, png).await?;
            Ok::<_, Error>(())
        }
        .await;

        match written {
            Ok(()) => {
                info!("Saved failure screenshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to capture screenshot for {}: {}", name, e);
                None
            }
        }
    }

    fn report(
        &self,
        info: &ScenarioInfo,
        diagnostics: &Diagnostics,
        result: Result<Outcome>,
        start: Instant,
        screenshot: Option<PathBuf>,
    ) -> ScenarioReport {
        let verdict = Verdict::from(&result);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(scenario = %info.name, "{} in {}ms", verdict.label(), duration_ms);

        ScenarioReport {
            name: info.name.clone(),
            tags: info.tags.clone(),
            verdict,
            events: diagnostics.events(),
            duration_ms,
            screenshot,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// `<dir>/<name>.png` with anything outside `[A-Za-z0-9_-]` replaced
pub fn screenshot_path(dir: &Path, name: &str) -> PathBuf {
    let file: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}.png", file))
}

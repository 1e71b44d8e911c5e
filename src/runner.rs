//! Scenario runner: selection, bounded parallel execution and the JSON report.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::fixture::Provisioner;
use crate::scenario::{ScenarioReport, Verdict};
use crate::scenarios::Scenario;
use crate::Result;

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Every tag must be present
    pub tags: Vec<String>,
    /// Case-insensitive name substring
    pub grep: Option<String>,
}

impl RunFilter {
    pub fn select(&self, scenarios: Vec<Scenario>) -> Vec<Scenario> {
        scenarios
            .into_iter()
            .filter(|s| s.matches(&self.tags, self.grep.as_deref()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    fn tally(reports: &[ScenarioReport], duration_ms: u64) -> Self {
        let mut summary = RunSummary {
            total: reports.len(),
            duration_ms,
            ..Default::default()
        };
        for report in reports {
            match report.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Skipped { .. } => summary.skipped += 1,
                Verdict::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    provisioner: Provisioner,
    workers: usize,
    artifacts_dir: PathBuf,
}

impl Runner {
    pub fn new(provisioner: Provisioner) -> Self {
        let config = provisioner.config();
        Self {
            workers: config.workers.max(1),
            artifacts_dir: config.artifacts_dir.clone(),
            provisioner,
        }
    }

    /// Run up to `workers` scenarios at once; reports keep catalogue order
    pub async fn run(&self, scenarios: Vec<Scenario>) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Running {} scenarios with {} workers", scenarios.len(), self.workers);

        let mut reports: Vec<(usize, ScenarioReport)> = stream::iter(scenarios.into_iter().enumerate())
            .map(|(index, scenario)| async move { (index, scenario.run(&self.provisioner).await) })
            .buffer_unordered(self.workers)
            .collect()
            .await;
        reports.sort_by_key(|(index, _)| *index);
        let scenarios: Vec<ScenarioReport> = reports.into_iter().map(|(_, report)| report).collect();

        let summary = RunSummary::tally(&scenarios, start.elapsed().as_millis() as u64);
        for report in scenarios.iter().filter(|r| r.verdict.is_failure()) {
            if let Verdict::Failed { step, error } = &report.verdict {
                warn!(
                    scenario = %report.name,
                    step = step.as_deref().unwrap_or("-"),
                    "{}",
                    error
                );
            }
        }
        info!(
            "{} passed, {} skipped, {} failed of {} in {}ms",
            summary.passed, summary.skipped, summary.failed, summary.total, summary.duration_ms
        );

        RunReport {
            started_at,
            summary,
            scenarios,
        }
    }

    /// Write `<artifacts>/report.json`
    pub async fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.artifacts_dir).await?;
        let path = self.artifacts_dir.join("report.json");
        tokio::fs::write(&path, serde_json::to_vec_pretty(report)?).await?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

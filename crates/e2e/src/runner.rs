//! Suite runner: gates, drives and records scenarios

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use reelcheck_common::{HarnessConfig, Target};

use crate::driver::{Driver, Outcome, StepResult};
use crate::error::E2eResult;
use crate::gate::{Availability, Gate};
use crate::page;
use crate::spec::Scenario;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub target: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    /// No scenario failed or errored. Skipped scenarios do not count.
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Runs scenarios against the configured target
pub struct TestRunner {
    config: HarnessConfig,
    target: Target,
    gate: Gate,
}

impl TestRunner {
    pub fn new(config: HarnessConfig) -> E2eResult<Self> {
        let target = config.target()?;
        let gate = Gate::new(target.clone(), config.target.probe_timeout)?;
        Ok(Self { config, target, gate })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Run a single scenario in its own session.
    ///
    /// The availability gate runs first; an unavailable target skips the
    /// scenario without touching a browser.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let (outcome, steps) = match self.gate.probe().await {
            Availability::Unavailable { reason } => (Outcome::Skipped { reason }, Vec::new()),
            Availability::Available { .. } => self.drive(scenario).await,
        };

        ScenarioResult {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
        }
    }

    async fn drive(&self, scenario: &Scenario) -> (Outcome, Vec<StepResult>) {
        let mut session = match page::open(&self.config.driver, &self.target).await {
            Ok(session) => session,
            Err(e) => {
                return (
                    Outcome::Errored {
                        step: None,
                        message: format!("could not open a browser session: {}", e),
                    },
                    Vec::new(),
                )
            }
        };

        let timeout = self.config.runner.scenario_timeout;
        let driver = Driver::new(session.as_mut(), &self.target, &self.config.driver);
        let result = match tokio::time::timeout(timeout, driver.drive(scenario)).await {
            Ok(report) => (report.outcome, report.steps),
            Err(_) => (
                Outcome::Errored {
                    step: None,
                    message: format!("scenario did not finish within {:?}", timeout),
                },
                Vec::new(),
            ),
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close session for {}: {}", scenario.name, e);
        }
        result
    }

    /// Run scenarios with up to `runner.workers` sessions at a time.
    ///
    /// Results keep the order of `scenarios`.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> TestSuiteResult {
        let start = Instant::now();
        let started_at = Utc::now();
        let workers = self.config.runner.workers.max(1);

        info!(
            "Running {} scenario(s) against {} ({} worker(s))...",
            scenarios.len(),
            self.target,
            workers
        );

        let mut indexed: Vec<(usize, ScenarioResult)> = stream::iter(scenarios.iter().enumerate())
            .map(|(i, scenario)| async move { (i, self.run_scenario(scenario).await) })
            .buffer_unordered(workers)
            .inspect(|(_, result)| report(result))
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);
        let results: Vec<ScenarioResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let count = |label: &str| results.iter().filter(|r| r.outcome.label() == label).count();
        let passed = count("passed");
        let failed = count("failed");
        let errored = count("errored");
        let skipped = count("skipped");
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Scenario Results: {} passed, {} failed, {} errored, {} skipped ({} ms)",
            passed, failed, errored, skipped, duration_ms
        );

        TestSuiteResult {
            run_id: Uuid::new_v4(),
            started_at,
            target: self.target.to_string(),
            total: scenarios.len(),
            passed,
            failed,
            errored,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Write suite results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.config.runner.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

fn report(result: &ScenarioResult) {
    match &result.outcome {
        Outcome::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
        Outcome::Failed { message, .. } => error!("✗ {} - {}", result.name, message),
        Outcome::Errored { message, .. } => error!("✗ {} [error] - {}", result.name, message),
        Outcome::Skipped { reason } => warn!("○ {} skipped - {}", result.name, reason),
    }
}

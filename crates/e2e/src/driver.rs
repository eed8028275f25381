//! Scenario driver
//!
//! Executes the steps of one scenario against one browser session. Waits
//! are soft: a readiness race that resolves nothing is logged and the
//! following assertions judge whatever state is actually observed. A failed
//! assertion ends the scenario as failed; an unusable session or an uncaught
//! page error ends it as errored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use reelcheck_common::routes::markers;
use reelcheck_common::{DriverConfig, Route, Target};

use crate::error::{E2eError, E2eResult};
use crate::expect::{self, Verdict};
use crate::locator::{Locator, TextPattern};
use crate::page::{LoadState, Page};
use crate::spec::{Scenario, Step};

/// Final status of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// An assertion disagreed with the observed state
    Failed { step: usize, message: String },
    /// The session was unusable or the page raised an uncaught error
    Errored { step: Option<usize>, message: String },
    /// The target was unavailable; nothing ran
    Skipped { reason: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed { .. } => "failed",
            Outcome::Errored { .. } => "errored",
            Outcome::Skipped { .. } => "skipped",
        }
    }

    /// Human readable detail, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { message, .. } | Outcome::Errored { message, .. } => Some(message),
            Outcome::Skipped { reason } => Some(reason),
        }
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub step_name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Steps executed and the resulting outcome
#[derive(Debug, Clone)]
pub struct DriveReport {
    pub outcome: Outcome,
    pub steps: Vec<StepResult>,
}

/// Drives one session through one scenario
pub struct Driver<'a> {
    page: &'a mut dyn Page,
    target: &'a Target,
    config: &'a DriverConfig,
    checkpoints: HashMap<String, String>,
}

fn ms(value: Option<u64>, default: Duration) -> Duration {
    value.map(Duration::from_millis).unwrap_or(default)
}

impl<'a> Driver<'a> {
    pub fn new(page: &'a mut dyn Page, target: &'a Target, config: &'a DriverConfig) -> Self {
        Self {
            page,
            target,
            config,
            checkpoints: HashMap::new(),
        }
    }

    /// Run every step in order, stopping at the first failure or error.
    pub async fn drive(mut self, scenario: &Scenario) -> DriveReport {
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut outcome = Outcome::Passed;

        for (index, step) in scenario.steps.iter().enumerate() {
            let start = Instant::now();
            let step_name = step.name();
            debug!("[{}] step {}: {}", scenario.name, index + 1, step_name);

            let result = self.execute(step).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let error = match result {
                Ok(Verdict::Pass) => None,
                Ok(Verdict::Fail(message)) => {
                    outcome = Outcome::Failed {
                        step: index,
                        message: format!("step {} ({}): {}", index + 1, step_name, message),
                    };
                    Some(message)
                }
                Err(e) => {
                    outcome = Outcome::Errored {
                        step: Some(index),
                        message: format!("step {} ({}): {}", index + 1, step_name, e),
                    };
                    Some(e.to_string())
                }
            };

            let stop = error.is_some();
            steps.push(StepResult {
                index,
                step_name,
                success: !stop,
                duration_ms,
                error,
            });
            if stop {
                break;
            }
        }

        // Uncaught page errors fail the scenario whatever the assertions said.
        if !matches!(outcome, Outcome::Errored { .. }) {
            let errors = self.page.diagnostics().page_errors();
            if !errors.is_empty() {
                outcome = Outcome::Errored {
                    step: None,
                    message: format!("uncaught page errors: {}", errors.join("; ")),
                };
            }
        }

        DriveReport { outcome, steps }
    }

    async fn execute(&mut self, step: &Step) -> E2eResult<Verdict> {
        match step {
            Step::Navigate { path } => {
                let url = self.target.url(path)?;
                self.page.goto(&url).await?;
            }
            Step::Search { term } => {
                let path = Route::Search { term: term.clone() }.path();
                let url = self.target.url(&path)?;
                self.page.goto(&url).await?;
            }
            Step::Click { locator, timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.navigation_timeout);
                if !self.page.click(locator, timeout).await? {
                    return Ok(Verdict::Fail(format!("no element matches {}", locator)));
                }
            }
            Step::Fill { locator, value } => {
                if !self.page.fill(locator, value).await? {
                    return Ok(Verdict::Fail(format!("no form field matches {}", locator)));
                }
            }
            Step::Submit { locator, timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.navigation_timeout);
                if !self.page.submit(locator, timeout).await? {
                    return Ok(Verdict::Fail(format!("no form field matches {}", locator)));
                }
            }
            Step::WaitForAny { locators, timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.readiness_timeout);
                match self.page.wait_for_any(locators, timeout).await? {
                    Some(index) => debug!("Readiness race won by condition #{}", index),
                    None => debug!("Readiness race timed out after {:?}", timeout),
                }
            }
            Step::WaitForUrl { pattern, timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.navigation_timeout);
                if !self.page.wait_for_url(pattern, timeout).await? {
                    debug!("URL did not match /{}/ within {:?}", pattern, timeout);
                }
            }
            Step::WaitForLoad { state, timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.load_timeout);
                if !self.page.wait_for_load(*state, timeout).await? {
                    debug!("{:?} not reached within {:?}", state, timeout);
                }
            }
            Step::GoBack { timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.navigation_timeout);
                if !self.page.go_back(timeout).await? {
                    debug!("History back did not navigate");
                }
            }
            Step::Back { timeout_ms } => {
                let timeout = ms(*timeout_ms, self.config.navigation_timeout);
                self.back(timeout).await?;
            }
            Step::ClickLogo => {
                let logo = Locator::css(markers::LOGO).first();
                if !self.page.click(&logo, self.config.navigation_timeout).await? {
                    return Ok(Verdict::Fail(format!("header logo link not found ({})", logo)));
                }
                if !self
                    .page
                    .wait_for_load(LoadState::DomContentLoaded, self.config.load_timeout)
                    .await?
                {
                    debug!("Page did not settle after clicking the logo");
                }
            }
            Step::Observe { ms } => {
                self.page.observe(Duration::from_millis(*ms)).await?;
            }
            Step::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            Step::Checkpoint { name } => {
                let url = self.page.url().await?;
                debug!("Checkpoint '{}' at {}", name, url);
                self.checkpoints.insert(name.clone(), url);
            }
            Step::Expect { that } => {
                return expect::evaluate(&mut *self.page, self.target, &self.checkpoints, that).await;
            }
            Step::Log { message } => {
                info!("[SCENARIO LOG] {}", message);
            }
        }
        Ok(Verdict::Pass)
    }

    /// Prefer the page's own back control, fall back to history.
    async fn back(&mut self, timeout: Duration) -> E2eResult<()> {
        let control = Locator::css(markers::CONTROL)
            .with_text(TextPattern::ci(markers::BACK_PATTERN))
            .first();

        let used_control = if self.page.query(&control).await?.is_empty() {
            false
        } else {
            debug!("Using back control {}", control);
            self.page.click(&control, timeout).await?
        };

        if !used_control && !self.page.go_back(timeout).await? {
            return Err(E2eError::Navigation {
                url: self.page.url().await?,
                reason: "no back control and no history entry".to_string(),
            });
        }

        if !self
            .page
            .wait_for_load(LoadState::DomContentLoaded, self.config.load_timeout)
            .await?
        {
            debug!("Page did not settle after going back");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Diagnostic, DiagnosticLog, ElementInfo};
    use crate::spec::{Assertion, Comparison};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Scripted session: elements are keyed by the locator's display form,
    /// clicks map a locator to the URL they lead to.
    #[derive(Default)]
    struct FakePage {
        url: String,
        history: Vec<String>,
        elements: HashMap<String, Vec<ElementInfo>>,
        links: HashMap<String, String>,
        fail_goto: bool,
        waits: usize,
        diagnostics: DiagnosticLog,
    }

    fn element(text: &str) -> ElementInfo {
        ElementInfo {
            tag: "h2".to_string(),
            text: text.to_string(),
            attributes: BTreeMap::new(),
            visible: true,
        }
    }

    impl FakePage {
        fn navigate(&mut self, url: String) {
            let previous = std::mem::replace(&mut self.url, url);
            self.history.push(previous);
        }
    }

    #[async_trait]
    impl Page for FakePage {
        async fn goto(&mut self, url: &url::Url) -> E2eResult<()> {
            if self.fail_goto {
                return Err(E2eError::Navigation {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            self.navigate(url.to_string());
            Ok(())
        }

        async fn url(&mut self) -> E2eResult<String> {
            Ok(self.url.clone())
        }

        async fn query(&mut self, locator: &Locator) -> E2eResult<Vec<ElementInfo>> {
            Ok(self.elements.get(&locator.to_string()).cloned().unwrap_or_default())
        }

        async fn click(&mut self, locator: &Locator, _timeout: Duration) -> E2eResult<bool> {
            let key = locator.to_string();
            if let Some(url) = self.links.get(&key).cloned() {
                self.navigate(url);
                return Ok(true);
            }
            Ok(self.elements.contains_key(&key))
        }

        async fn fill(&mut self, locator: &Locator, _value: &str) -> E2eResult<bool> {
            Ok(self.elements.contains_key(&locator.to_string()))
        }

        async fn submit(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<bool> {
            self.click(locator, timeout).await
        }

        async fn go_back(&mut self, _timeout: Duration) -> E2eResult<bool> {
            match self.history.pop() {
                Some(url) => {
                    self.url = url;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn wait_for_any(&mut self, _locators: &[Locator], _timeout: Duration) -> E2eResult<Option<usize>> {
            self.waits += 1;
            Ok(None)
        }

        async fn wait_for_url(&mut self, _pattern: &str, _timeout: Duration) -> E2eResult<bool> {
            self.waits += 1;
            Ok(false)
        }

        async fn wait_for_load(&mut self, _state: LoadState, _timeout: Duration) -> E2eResult<bool> {
            Ok(true)
        }

        async fn observe(&mut self, _window: Duration) -> E2eResult<()> {
            Ok(())
        }

        fn diagnostics(&self) -> &DiagnosticLog {
            &self.diagnostics
        }

        async fn close(&mut self) -> E2eResult<()> {
            Ok(())
        }
    }

    fn target() -> Target {
        Target::parse("http://localhost:3000").unwrap()
    }

    fn titles() -> Locator {
        Locator::css(markers::RESULT_TITLE)
    }

    async fn drive(page: &mut FakePage, scenario: &Scenario) -> DriveReport {
        let target = target();
        let config = DriverConfig::default();
        Driver::new(page, &target, &config).drive(scenario).await
    }

    #[tokio::test]
    async fn test_soft_waits_do_not_fail() {
        let mut page = FakePage::default();
        page.elements.insert(titles().to_string(), vec![element("Inception")]);

        let scenario = Scenario::new("soft", "")
            .step(Step::Search { term: "Inception".into() })
            .step(Step::WaitForAny {
                locators: vec![titles()],
                timeout_ms: Some(10),
            })
            .step(Step::WaitForUrl {
                pattern: "never".into(),
                timeout_ms: Some(10),
            })
            .expect(Assertion::Count {
                locator: titles(),
                op: Comparison::Gt,
                value: 0,
            });

        let report = drive(&mut page, &scenario).await;
        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(page.waits, 2);
        assert_eq!(page.url, "http://localhost:3000/search?q=Inception");
    }

    #[tokio::test]
    async fn test_failed_assertion_stops_scenario() {
        let mut page = FakePage::default();
        let scenario = Scenario::new("fail", "")
            .step(Step::Navigate { path: "/".into() })
            .expect(Assertion::Count {
                locator: titles(),
                op: Comparison::Gt,
                value: 0,
            })
            .step(Step::Checkpoint { name: "never".into() });

        let report = drive(&mut page, &scenario).await;
        match &report.outcome {
            Outcome::Failed { step, message } => {
                assert_eq!(*step, 1);
                assert!(message.contains("h2.line-clamp-1"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(report.steps.len(), 2);
        assert!(!report.steps[1].success);
    }

    #[tokio::test]
    async fn test_navigation_error_is_errored() {
        let mut page = FakePage {
            fail_goto: true,
            ..Default::default()
        };
        let scenario = Scenario::new("down", "").step(Step::Navigate { path: "/".into() });

        let report = drive(&mut page, &scenario).await;
        assert!(matches!(report.outcome, Outcome::Errored { step: Some(0), .. }));
    }

    #[tokio::test]
    async fn test_page_error_overrides_failure() {
        let mut page = FakePage::default();
        page.diagnostics.push(Diagnostic::PageError {
            message: "Uncaught TypeError: x is undefined".into(),
        });
        let scenario = Scenario::new("crash", "")
            .step(Step::Navigate { path: "/".into() })
            .expect(Assertion::Visible { locator: titles() });

        let report = drive(&mut page, &scenario).await;
        match report.outcome {
            Outcome::Errored { step: None, message } => assert!(message.contains("Uncaught TypeError")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_click_target_fails() {
        let mut page = FakePage::default();
        let scenario = Scenario::new("click", "")
            .step(Step::Navigate { path: "/".into() })
            .step(Step::ClickLogo);

        let report = drive(&mut page, &scenario).await;
        assert!(matches!(report.outcome, Outcome::Failed { step: 1, .. }));
    }

    #[tokio::test]
    async fn test_back_prefers_ui_control() {
        let control = Locator::css(markers::CONTROL)
            .with_text(TextPattern::ci(markers::BACK_PATTERN))
            .first();
        let mut page = FakePage::default();
        page.elements.insert(control.to_string(), vec![element("Back")]);
        page.links
            .insert(control.to_string(), "http://localhost:3000/search?q=x".to_string());

        let scenario = Scenario::new("back", "")
            .step(Step::Navigate { path: "/".into() })
            .step(Step::Navigate { path: "/movie/1".into() })
            .step(Step::Back { timeout_ms: None })
            .expect(Assertion::UrlNotMatches {
                pattern: r"/(movie|tv)/\d+".into(),
            });

        let report = drive(&mut page, &scenario).await;
        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(page.url, "http://localhost:3000/search?q=x");
    }

    #[tokio::test]
    async fn test_back_falls_back_to_history() {
        let mut page = FakePage::default();
        let scenario = Scenario::new("history", "")
            .step(Step::Navigate { path: "/".into() })
            .step(Step::Navigate { path: "/movie/1".into() })
            .step(Step::Back { timeout_ms: None })
            .expect(Assertion::AtHome);

        let report = drive(&mut page, &scenario).await;
        assert_eq!(report.outcome, Outcome::Passed);
    }

    #[tokio::test]
    async fn test_checkpoint_comparison() {
        let mut page = FakePage::default();
        let scenario = Scenario::new("checkpoint", "")
            .step(Step::Navigate { path: "/".into() })
            .step(Step::Checkpoint { name: "home".into() })
            .step(Step::Navigate { path: "/search?q=a".into() })
            .expect(Assertion::UrlAtCheckpoint { name: "home".into() });

        let report = drive(&mut page, &scenario).await;
        assert!(matches!(report.outcome, Outcome::Failed { step: 3, .. }));
    }
}

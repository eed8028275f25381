//! Declarative scenario specification
//!
//! Scenarios are built in Rust by the catalog or parsed from YAML files.
//! Expectations are ordinary steps, so they run at the point in the flow
//! where the state they describe is observable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use reelcheck_common::RouteKind;

use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, TextPattern};
use crate::page::LoadState;

/// A complete scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path (relative to the target base)
    Navigate { path: String },

    /// Navigate to the search route with a percent-encoded term
    Search { term: String },

    /// Click the first element matching a locator
    Click {
        locator: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill a form field
    Fill { locator: Locator, value: String },

    /// Submit the form owning a field, like pressing Enter in it
    Submit {
        locator: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Race visibility of several locators; a timeout is not an error
    WaitForAny {
        locators: Vec<Locator>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for the URL to match a regular expression
    WaitForUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for a document lifecycle milestone
    WaitForLoad {
        #[serde(default)]
        state: LoadState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Browser history back
    GoBack {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Use the page's own back control if it has one, else history back
    Back {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click the brand link in the header
    ClickLogo,

    /// Keep the session open to collect late diagnostics
    Observe { ms: u64 },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Remember the current URL under a name
    Checkpoint { name: String },

    /// Check an assertion against the current state
    Expect { that: Assertion },

    /// Log a message (for debugging)
    Log { message: String },
}

/// How an observed count is compared with the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn holds(&self, actual: usize, expected: usize) -> bool {
        match self {
            Comparison::Eq => actual == expected,
            Comparison::Gt => actual > expected,
            Comparison::Gte => actual >= expected,
            Comparison::Lt => actual < expected,
            Comparison::Lte => actual <= expected,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Eq => "==",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        };
        f.write_str(s)
    }
}

fn default_sample() -> usize {
    5
}

/// A predicate over observable state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Assertion {
    UrlContains { value: String },
    UrlNotContains { value: String },
    UrlMatches { pattern: String },
    UrlNotMatches { pattern: String },

    /// URL equals the target base, trailing-slash insensitive
    AtHome,

    /// Current route belongs to one of `kinds`
    OnRoute { kinds: Vec<RouteKind> },

    /// URL equals the one remembered at a checkpoint
    UrlAtCheckpoint { name: String },

    Count {
        locator: Locator,
        op: Comparison,
        value: usize,
    },

    /// At least one match is visible
    Visible { locator: Locator },

    /// At least one match has text matching `pattern`
    TextMatches { locator: Locator, pattern: TextPattern },

    /// The first match has attribute `name` containing `value`
    AttributeContains {
        locator: Locator,
        name: String,
        value: String,
    },

    /// The first `sample` matches have non-blank text
    TextsNonEmpty {
        locator: Locator,
        #[serde(default = "default_sample")]
        sample: usize,
    },

    /// The first `sample` matches contain none of `words` (case-insensitive)
    TextsExclude {
        locator: Locator,
        words: Vec<String>,
        #[serde(default = "default_sample")]
        sample: usize,
    },

    /// No 404 from the target so far, static and icon assets excluded
    NoNotFoundResponses,

    /// A trailer section never appears without a playback control
    TrailerContract,

    /// No uncaught page error so far
    NoPageErrors,
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn expect(self, assertion: Assertion) -> Self {
        self.step(Step::Expect { that: assertion })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::ScenarioNotFound(dir.display().to_string()));
        }

        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.has_tag(tag)).collect()
    }
}

impl Step {
    /// Short label used in logs and results
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { path } => format!("navigate:{}", path),
            Step::Search { term } => {
                format!("search:{}", term.chars().take(30).collect::<String>())
            }
            Step::Click { locator, .. } => format!("click:{}", locator),
            Step::Fill { locator, .. } => format!("fill:{}", locator),
            Step::Submit { locator, .. } => format!("submit:{}", locator),
            Step::WaitForAny { locators, .. } => format!(
                "wait_for_any:{}",
                locators
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
            Step::WaitForUrl { pattern, .. } => format!("wait_for_url:{}", pattern),
            Step::WaitForLoad { state, .. } => format!("wait_for_load:{:?}", state),
            Step::GoBack { .. } => "go_back".to_string(),
            Step::Back { .. } => "back".to_string(),
            Step::ClickLogo => "click_logo".to_string(),
            Step::Observe { ms } => format!("observe:{}ms", ms),
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Checkpoint { name } => format!("checkpoint:{}", name),
            Step::Expect { that } => format!("expect:{}", that.name()),
            Step::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl Assertion {
    pub fn name(&self) -> &'static str {
        match self {
            Assertion::UrlContains { .. } => "url_contains",
            Assertion::UrlNotContains { .. } => "url_not_contains",
            Assertion::UrlMatches { .. } => "url_matches",
            Assertion::UrlNotMatches { .. } => "url_not_matches",
            Assertion::AtHome => "at_home",
            Assertion::OnRoute { .. } => "on_route",
            Assertion::UrlAtCheckpoint { .. } => "url_at_checkpoint",
            Assertion::Count { .. } => "count",
            Assertion::Visible { .. } => "visible",
            Assertion::TextMatches { .. } => "text_matches",
            Assertion::AttributeContains { .. } => "attribute_contains",
            Assertion::TextsNonEmpty { .. } => "texts_non_empty",
            Assertion::TextsExclude { .. } => "texts_exclude",
            Assertion::NoNotFoundResponses => "no_not_found_responses",
            Assertion::TrailerContract => "trailer_contract",
            Assertion::NoPageErrors => "no_page_errors",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_scenario() {
        let yaml = r#"
name: search-inception
description: Exact title returns results
tags:
  - search
  - smoke
steps:
  - action: search
    term: Inception
  - action: wait_for_any
    locators:
      - css: h2.line-clamp-1
      - by_text: true
        text: { pattern: No results found, case_insensitive: true }
    timeout_ms: 15000
  - action: expect
    that:
      check: count
      locator: { css: h2.line-clamp-1 }
      op: gt
      value: 0
  - action: expect
    that:
      check: text_matches
      locator: { css: h2.line-clamp-1 }
      pattern: { pattern: inception, case_insensitive: true }
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "search-inception");
        assert_eq!(scenario.steps.len(), 4);
        assert!(scenario.has_tag("smoke"));
        assert!(matches!(
            &scenario.steps[2],
            Step::Expect {
                that: Assertion::Count { op: Comparison::Gt, value: 0, .. }
            }
        ));
    }

    #[test]
    fn test_parse_navigation_scenario() {
        let yaml = r#"
name: logo-from-detail
steps:
  - action: navigate
    path: /
  - action: click
    locator: { css: 'a[href^="/movie/"]', nth: 0 }
  - action: wait_for_url
    pattern: '/movie/\d+'
  - action: click_logo
  - action: wait_for_load
    state: load
  - action: expect
    that: { check: at_home }
  - action: expect
    that: { check: on_route, kinds: [home, search] }
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!(scenario.description.is_empty());
        assert!(matches!(scenario.steps[3], Step::ClickLogo));
        assert!(matches!(
            scenario.steps[4],
            Step::WaitForLoad { state: LoadState::Load, timeout_ms: None }
        ));
        match &scenario.steps[6] {
            Step::Expect { that: Assertion::OnRoute { kinds } } => {
                assert_eq!(kinds, &vec![RouteKind::Home, RouteKind::Search]);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_scenario_without_steps_is_rejected() {
        let err = Scenario::from_yaml("name: empty\nsteps: []\n").unwrap_err();
        assert!(matches!(err, E2eError::ScenarioParse(_)));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = "name: x\nsteps:\n  - action: teleport\n";
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::Yaml(_))));
    }

    #[test]
    fn test_load_all_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\ntags: [nav]\nsteps:\n  - action: navigate\n    path: /\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\nsteps:\n  - action: observe\n    ms: 10\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(Scenario::filter_by_tag(&scenarios, "nav").len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let err = Scenario::load_all(Path::new("/nonexistent/reelcheck")).unwrap_err();
        assert!(matches!(err, E2eError::ScenarioNotFound(_)));
    }

    #[test]
    fn test_step_names() {
        let step = Step::Search { term: "a".repeat(100) };
        assert_eq!(step.name(), format!("search:{}", "a".repeat(30)));
        let step = Step::Expect { that: Assertion::TrailerContract };
        assert_eq!(step.name(), "expect:trailer_contract");
    }

    #[test]
    fn test_comparison() {
        assert!(Comparison::Gt.holds(3, 0));
        assert!(!Comparison::Eq.holds(1, 0));
        assert!(Comparison::Lte.holds(50, 50));
    }
}

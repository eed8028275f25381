//! Harness configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! environment variables. The CLI applies its flags on top.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::{CommonError, CommonResult};
use crate::target::Target;
use crate::{BASE_URL_ENV, DEFAULT_BASE_URL};

/// Environment variable naming a TOML config file
pub const CONFIG_ENV: &str = "REELCHECK_CONFIG";
/// Environment variable selecting the browser driver
pub const DRIVER_ENV: &str = "REELCHECK_DRIVER";
/// Environment variable setting the number of parallel scenario workers
pub const WORKERS_ENV: &str = "REELCHECK_WORKERS";

/// Full harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Site under test
    pub target: TargetConfig,

    /// Browser session settings
    pub driver: DriverConfig,

    /// Scenario runner settings
    pub runner: RunnerConfig,

    /// Load generator settings
    pub load: LoadConfig,
}

/// Site under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the application
    pub base_url: String,

    /// Upper bound for the availability probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Which browser implementation drives the scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// In-process HTTP client that inspects server-rendered documents
    #[default]
    Http,
    /// Headless browser through a Node Playwright bridge
    Playwright,
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(DriverKind::Http),
            "playwright" | "browser" => Ok(DriverKind::Playwright),
            other => Err(format!("unknown driver '{}' (expected http or playwright)", other)),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Http => f.write_str("http"),
            DriverKind::Playwright => f.write_str("playwright"),
        }
    }
}

/// Browser session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,

    /// Upper bound for a single navigation
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,

    /// Default upper bound for readiness races
    #[serde(with = "humantime_serde")]
    pub readiness_timeout: Duration,

    /// Upper bound for document/network settle waits
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,

    /// Fetch same-origin scripts and stylesheets after each document (http driver)
    pub fetch_subresources: bool,

    /// Cap on subresources fetched per document (http driver)
    pub max_subresources: usize,

    /// Browser engine for the playwright driver (chromium, firefox, webkit)
    pub browser: String,

    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::Http,
            navigation_timeout: Duration::from_secs(15),
            readiness_timeout: Duration::from_secs(15),
            load_timeout: Duration::from_secs(30),
            fetch_subresources: true,
            max_subresources: 32,
            browser: "chromium".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Scenario runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Scenarios executed concurrently, each with its own session
    pub workers: usize,

    /// Upper bound for a whole scenario
    #[serde(with = "humantime_serde")]
    pub scenario_timeout: Duration,

    /// Extra YAML scenario files
    pub scenarios_dir: Option<PathBuf>,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            scenario_timeout: Duration::from_secs(60),
            scenarios_dir: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// One ramp stage of the load profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: u32,
}

impl FromStr for StageConfig {
    type Err = String;

    /// Parse `<duration>:<target>`, e.g. `30s:20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid stage '{}' (expected <duration>:<vus>)", s))?;
        let duration = humantime::parse_duration(duration.trim())
            .map_err(|e| format!("invalid stage duration '{}': {}", duration, e))?;
        let target = target
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid stage target '{}': {}", target, e))?;
        Ok(Self { duration, target })
    }
}

/// Load generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Path requested by every iteration
    pub endpoint: String,

    /// Ramp profile
    pub stages: Vec<StageConfig>,

    /// Pause between iterations of one virtual user
    #[serde(with = "humantime_serde")]
    pub think_time: Duration,

    /// Upper bound for a single request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How long in-flight iterations may run after the last stage
    #[serde(with = "humantime_serde")]
    pub graceful_stop: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            endpoint: "/".to_string(),
            stages: vec![StageConfig {
                duration: Duration::from_secs(30),
                target: 20,
            }],
            think_time: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            graceful_stop: Duration::from_secs(30),
        }
    }
}

impl HarnessConfig {
    /// Parse a config from a TOML string
    pub fn from_toml(content: &str) -> CommonResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a config from a TOML file
    pub fn from_file(path: &Path) -> CommonResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Defaults, then the file (explicit path or `REELCHECK_CONFIG`), then env.
    pub fn load(path: Option<&Path>) -> CommonResult<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => {
                debug!("Loading config from {}", file.display());
                Self::from_file(&file)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> CommonResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.target.base_url = base_url;
        }

        if let Some(driver) = lookup(DRIVER_ENV) {
            self.driver.kind = driver.parse().map_err(CommonError::InvalidConfig)?;
        }

        if let Some(workers) = lookup(WORKERS_ENV) {
            self.runner.workers = workers.trim().parse().map_err(|_| {
                CommonError::InvalidConfig(format!("{} must be a number, got '{}'", WORKERS_ENV, workers))
            })?;
        }

        Ok(())
    }

    /// Check invariants the rest of the harness relies on.
    pub fn validate(&self) -> CommonResult<()> {
        Target::parse(&self.target.base_url)?;

        if self.runner.workers == 0 {
            return Err(CommonError::InvalidConfig("runner.workers must be at least 1".into()));
        }
        if self.load.stages.is_empty() {
            return Err(CommonError::InvalidConfig("load.stages must not be empty".into()));
        }
        if !self.load.endpoint.starts_with('/') {
            return Err(CommonError::InvalidConfig(format!(
                "load.endpoint must start with '/', got '{}'",
                self.load.endpoint
            )));
        }
        Ok(())
    }

    /// The configured target
    pub fn target(&self) -> CommonResult<Target> {
        Target::parse(&self.target.base_url)
    }
}

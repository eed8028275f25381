//! Run Command

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use reelcheck_common::{DriverKind, HarnessConfig};
use reelcheck_e2e::{ScenarioResult, TestRunner};

use super::{collect_scenarios, select};
use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Only run scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Only run scenarios with this name (repeatable)
    #[arg(long)]
    pub name: Vec<String>,

    /// Directory of YAML scenarios to run after the built-in ones
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Skip the built-in catalog
    #[arg(long)]
    pub no_builtin: bool,

    /// Browser driver (http or playwright)
    #[arg(long)]
    pub driver: Option<DriverKind>,

    /// Scenarios run concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Directory receiving test-results.json
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(driver) = self.driver {
            config.driver.kind = driver;
        }
        if let Some(workers) = self.workers {
            config.runner.workers = workers.max(1);
        }
        if let Some(output) = &self.output {
            config.runner.output_dir = output.clone();
        }
        if let Some(dir) = &self.scenarios {
            config.runner.scenarios_dir = Some(dir.clone());
        }
    }
}

impl TableDisplay for ScenarioResult {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Outcome", "Duration", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            output::outcome_label(&self.outcome),
            format!("{}ms", self.duration_ms),
            self.outcome.message().unwrap_or_default().to_string(),
        ]
    }
}

/// Returns whether the run succeeded (no failed or errored scenario).
pub async fn execute(args: RunArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<bool> {
    args.apply(&mut config);

    let scenarios = collect_scenarios(config.runner.scenarios_dir.as_deref(), !args.no_builtin)?;
    let scenarios = select(scenarios, args.tag.as_deref(), &args.name);
    if scenarios.is_empty() {
        bail!("no scenario matches the given --tag/--name filters");
    }

    let runner = TestRunner::new(config)?;
    let suite = runner.run_scenarios(&scenarios).await;
    let path = runner.write_results(&suite)?;

    match format {
        OutputFormat::Json => output::print_json(&suite)?,
        OutputFormat::Table => {
            output::print_list(&suite.results, format)?;
            println!(
                "{} passed, {} failed, {} errored, {} skipped in {}ms against {}",
                suite.passed.to_string().green(),
                suite.failed.to_string().red(),
                suite.errored.to_string().red(),
                suite.skipped.to_string().yellow(),
                suite.duration_ms,
                suite.target
            );
            println!("Results: {}", path.display());

            if suite.skipped == suite.total {
                output::print_warning("Every scenario was skipped; is the application running?");
            } else if suite.success() {
                output::print_success("All executed scenarios passed");
            } else {
                output::print_error("Some scenarios failed");
            }
        }
    }

    Ok(suite.success())
}

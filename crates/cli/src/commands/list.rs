//! List Command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use reelcheck_common::HarnessConfig;
use reelcheck_e2e::Scenario;

use super::{collect_scenarios, select};
use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Only list scenarios carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Also list YAML scenarios from this directory
    #[arg(long)]
    pub scenarios: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct ScenarioDisplay {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub steps: usize,
}

impl From<&Scenario> for ScenarioDisplay {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            tags: scenario.tags.clone(),
            steps: scenario.steps.len(),
        }
    }
}

impl TableDisplay for ScenarioDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Tags", "Steps", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.tags.join(", "),
            self.steps.to_string(),
            self.description.clone(),
        ]
    }
}

pub fn execute(args: ListArgs, config: &HarnessConfig, format: OutputFormat) -> Result<bool> {
    let dir = args.scenarios.as_deref().or(config.runner.scenarios_dir.as_deref());
    let scenarios = select(collect_scenarios(dir, true)?, args.tag.as_deref(), &[]);

    let displays: Vec<ScenarioDisplay> = scenarios.iter().map(ScenarioDisplay::from).collect();
    print_list(&displays, format)?;
    Ok(true)
}

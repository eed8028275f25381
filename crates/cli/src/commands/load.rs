//! Load Command

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use reelcheck_common::{HarnessConfig, StageConfig};
use reelcheck_load::LoadGenerator;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LoadArgs {
    /// Ramp stage as <duration>:<vus>, e.g. 30s:20 (repeatable)
    #[arg(long)]
    pub stage: Vec<StageConfig>,

    /// Pause between iterations of one virtual user
    #[arg(long, value_parser = humantime::parse_duration)]
    pub think_time: Option<Duration>,

    /// Path requested by every iteration
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl LoadArgs {
    fn apply(&self, config: &mut HarnessConfig) {
        if !self.stage.is_empty() {
            config.load.stages = self.stage.clone();
        }
        if let Some(think_time) = self.think_time {
            config.load.think_time = think_time;
        }
        if let Some(endpoint) = &self.endpoint {
            config.load.endpoint = endpoint.clone();
        }
    }
}

/// Runs the profile and reports it. Only a run that cannot start is an error.
pub async fn execute(args: LoadArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<bool> {
    args.apply(&mut config);
    config.validate()?;

    let generator = LoadGenerator::new(&config.load, &config.target()?)?;
    let summary = generator.run().await;

    match format {
        OutputFormat::Json => output::print_json(&summary)?,
        OutputFormat::Table => {
            let latency = &summary.latency;
            output::print_pairs(&[
                ("endpoint", generator.url().to_string()),
                ("duration", format!("{:.1}s", summary.duration_ms as f64 / 1000.0)),
                ("requests", summary.requests.to_string()),
                ("request rate", format!("{:.2}/s", summary.request_rate)),
                (
                    "failed",
                    format!("{} ({:.2}%)", summary.failed, summary.failure_rate * 100.0),
                ),
                ("iterations", summary.iterations.to_string()),
                ("max vus", summary.max_vus.to_string()),
                ("latency min", format!("{:.2}ms", latency.min)),
                ("latency avg", format!("{:.2}ms", latency.avg)),
                ("latency median", format!("{:.2}ms", latency.median)),
                ("latency p90", format!("{:.2}ms", latency.p90)),
                ("latency p95", format!("{:.2}ms", latency.p95)),
                ("latency max", format!("{:.2}ms", latency.max)),
            ]);
        }
    }

    Ok(true)
}

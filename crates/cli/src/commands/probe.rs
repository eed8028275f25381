//! Probe Command

use anyhow::Result;

use reelcheck_common::HarnessConfig;
use reelcheck_e2e::{Availability, Gate};

use crate::output::{self, OutputFormat};

/// Returns whether the target is available.
pub async fn execute(config: &HarnessConfig, format: OutputFormat) -> Result<bool> {
    let gate = Gate::new(config.target()?, config.target.probe_timeout)?;
    let availability = gate.probe().await;

    match format {
        OutputFormat::Json => output::print_json(&availability)?,
        OutputFormat::Table => match &availability {
            Availability::Available { status, elapsed_ms } => output::print_success(&format!(
                "{} responded {} in {}ms",
                gate.target(),
                status,
                elapsed_ms
            )),
            Availability::Unavailable { reason } => output::print_error(reason),
        },
    }

    Ok(availability.is_available())
}

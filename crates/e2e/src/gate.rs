//! Availability gate - liveness probe of the site under test

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use reelcheck_common::Target;

use crate::error::E2eResult;

/// Outcome of probing the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    Available { status: u16, elapsed_ms: u64 },
    /// The reason names the target and is shown as the skip reason
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }
}

/// Issues one bounded GET to the target base URL.
#[derive(Debug, Clone)]
pub struct Gate {
    client: reqwest::Client,
    target: Target,
}

impl Gate {
    pub fn new(target: Target, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Probe the target once.
    ///
    /// Transport failures (refused, DNS, timeout) and non-success statuses
    /// both yield [`Availability::Unavailable`]; the probe never errors.
    pub async fn probe(&self) -> Availability {
        let start = Instant::now();

        let detail = match self.client.get(self.target.base().clone()).send().await {
            Ok(resp) if resp.status().is_success() => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!("{} responded {} in {} ms", self.target, resp.status(), elapsed_ms);
                return Availability::Available {
                    status: resp.status().as_u16(),
                    elapsed_ms,
                };
            }
            Ok(resp) => format!("status {}", resp.status()),
            Err(e) if e.is_timeout() => "timed out".to_string(),
            Err(e) if e.is_connect() => "connection failed".to_string(),
            Err(e) => e.to_string(),
        };

        warn!("Availability probe of {} failed: {}", self.target, detail);
        Availability::Unavailable {
            reason: format!(
                "The application is not responding at {} ({}). Start the server and re-run the scenarios.",
                self.target, detail
            ),
        }
    }
}

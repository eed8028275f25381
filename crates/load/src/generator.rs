//! Ramping-VU executor

use futures::future::join_all;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use reelcheck_common::{LoadConfig, Target};

use crate::error::LoadResult;
use crate::metrics::{LoadSummary, Metrics};
use crate::profile::Profile;

/// How often the controller re-evaluates the profile
const TICK: Duration = Duration::from_millis(100);

/// How often progress is logged
const PROGRESS_EVERY: Duration = Duration::from_secs(5);

/// Runs a staged load profile against one endpoint of the target.
pub struct LoadGenerator {
    client: reqwest::Client,
    url: Url,
    endpoint: String,
    profile: Profile,
    think_time: Duration,
    graceful_stop: Duration,
}

impl LoadGenerator {
    pub fn new(config: &LoadConfig, target: &Target) -> LoadResult<Self> {
        let profile = Profile::new(config.stages.clone())?;
        let url = target.url(&config.endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("reelcheck-load/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            endpoint: config.endpoint.clone(),
            profile,
            think_time: config.think_time,
            graceful_stop: config.graceful_stop,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Run the whole profile and summarize it.
    ///
    /// Request failures are data, not errors: they only show up in the
    /// summary's failure rate.
    pub async fn run(&self) -> LoadSummary {
        let total = self.profile.total_duration();
        info!(
            "Load: {} stage(s), {:?} total, up to {} VU(s) against {}",
            self.profile.stages().len(),
            total,
            self.profile.max_vus(),
            self.url
        );

        let metrics = Metrics::new();
        // Some(n): VUs with id < n run; None: stop.
        let (active_tx, active_rx) = watch::channel(Some(0u32));
        let mut vus: Vec<JoinHandle<()>> = Vec::new();

        let start = Instant::now();
        let mut ticker = tokio::time::interval(TICK);
        let mut last_progress = Duration::ZERO;
        let mut active = 0u32;

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = self.profile.target_at(elapsed);
            while (vus.len() as u32) < target {
                let id = vus.len() as u32;
                vus.push(tokio::spawn(virtual_user(
                    id,
                    self.client.clone(),
                    self.url.clone(),
                    self.think_time,
                    metrics.clone(),
                    active_rx.clone(),
                )));
            }

            if target != active {
                debug!("Active VUs: {} -> {}", active, target);
                active = target;
                metrics.observe_vus(active);
                let _ = active_tx.send(Some(active));
            }

            if elapsed - last_progress >= PROGRESS_EVERY {
                last_progress = elapsed;
                info!(
                    "{:>6.1}s  vus={:<4} requests={}",
                    elapsed.as_secs_f64(),
                    active,
                    metrics.requests()
                );
            }
        }

        let _ = active_tx.send(None);
        self.stop(vus).await;

        let summary = metrics.summary(&self.endpoint, start.elapsed());
        info!(
            "Load finished: {} request(s), {:.1}% failed, p95 {:.1} ms",
            summary.requests,
            summary.failure_rate * 100.0,
            summary.latency.p95
        );
        summary
    }

    /// Let in-flight iterations finish within the grace period, then abort.
    async fn stop(&self, vus: Vec<JoinHandle<()>>) {
        let aborts: Vec<_> = vus.iter().map(|vu| vu.abort_handle()).collect();
        if tokio::time::timeout(self.graceful_stop, join_all(vus)).await.is_err() {
            warn!(
                "{} VU(s) still running after {:?}, aborting",
                aborts.iter().filter(|a| !a.is_finished()).count(),
                self.graceful_stop
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

/// One VU: iterate while its id is below the active count.
async fn virtual_user(
    id: u32,
    client: reqwest::Client,
    url: Url,
    think_time: Duration,
    metrics: Metrics,
    mut active: watch::Receiver<Option<u32>>,
) {
    loop {
        let current = *active.borrow_and_update();
        match current {
            None => break,
            Some(n) if id >= n => {
                if active.changed().await.is_err() {
                    break;
                }
                continue;
            }
            Some(_) => {}
        }

        let start = Instant::now();
        let ok = match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(_) => status.as_u16() < 400,
                    Err(e) => {
                        debug!("VU {}: body read failed: {}", id, e);
                        false
                    }
                }
            }
            Err(e) => {
                debug!("VU {}: request failed: {}", id, e);
                false
            }
        };
        metrics.record_request(start.elapsed(), ok);
        metrics.record_iteration();

        tokio::time::sleep(think_time).await;
    }
}

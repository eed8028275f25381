//! Staged VU profile

use serde::Serialize;
use std::time::Duration;

use reelcheck_common::StageConfig;

use crate::error::{LoadError, LoadResult};

/// Sequence of ramp stages, starting from zero VUs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    stages: Vec<StageConfig>,
}

impl Profile {
    pub fn new(stages: Vec<StageConfig>) -> LoadResult<Self> {
        if stages.is_empty() {
            return Err(LoadError::InvalidProfile("at least one stage is required".to_string()));
        }
        if stages.iter().all(|s| s.duration.is_zero()) {
            return Err(LoadError::InvalidProfile("total duration is zero".to_string()));
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest VU count any stage ramps to
    pub fn max_vus(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target VU count `elapsed` into the run.
    ///
    /// Within a stage the count moves linearly from the previous stage's
    /// target (zero for the first) to this stage's target, rounded to the
    /// nearest whole VU. Past the last stage the final target holds.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let value = from as f64 + (stage.target as f64 - from as f64) * progress;
                return value.round().max(0.0) as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}

//! Ramping virtual-user load probe
//!
//! Each VU loops `GET endpoint -> record -> think`. A controller follows a
//! staged profile that starts from zero VUs and interpolates linearly to
//! each stage's target; VUs above the current target park after finishing
//! their iteration. The run reports throughput, failures and latency
//! percentiles without judging them.

pub mod error;
pub mod generator;
pub mod metrics;
pub mod profile;

pub use error::{LoadError, LoadResult};
pub use generator::LoadGenerator;
pub use metrics::{LatencyStats, LoadSummary, Metrics};
pub use profile::Profile;

//! reelcheck common library
//!
//! Shared configuration, target addressing and the navigation model of the
//! site under test. Both the scenario harness and the load probe build on
//! these types.

pub mod config;
pub mod error;
pub mod routes;
pub mod target;

pub use config::{DriverConfig, DriverKind, HarnessConfig, LoadConfig, RunnerConfig, StageConfig, TargetConfig};
pub use error::{CommonError, CommonResult};
pub use routes::{Route, RouteKind};
pub use target::Target;

/// reelcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the base URL of the site under test
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

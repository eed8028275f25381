//! reelcheck scenario harness
//!
//! Black-box checks of a server-rendered movie site:
//! - probes the target before every scenario and skips when it is down
//! - drives a browser session through declarative steps
//! - asserts URL, DOM and diagnostic invariants along the way
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     TestRunner (Rust)                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  for each Scenario (up to N workers)                         │
//! │    ├── Gate::probe() -> Available | Unavailable (skip)       │
//! │    ├── page::open() -> Box<dyn Page>                         │
//! │    │     ├── HttpPage       (reqwest + scraper)              │
//! │    │     └── PlaywrightPage (node bridge, JSON lines)        │
//! │    └── Driver::drive() -> Passed | Failed | Errored          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Scenario (Rust catalog or YAML)                             │
//! │    └── steps: navigate, search, click, wait_for_any, back,   │
//! │               click_logo, observe, expect { check }, ...     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod driver;
pub mod error;
pub mod expect;
pub mod gate;
pub mod locator;
pub mod page;
pub mod runner;
pub mod spec;

pub use driver::{Driver, Outcome, StepResult};
pub use error::{E2eError, E2eResult};
pub use gate::{Availability, Gate};
pub use locator::{Locator, TextPattern};
pub use page::Page;
pub use runner::{ScenarioResult, TestRunner, TestSuiteResult};
pub use spec::{Assertion, Comparison, Scenario, Step};

//! Browser sessions
//!
//! [`Page`] is the seam between the scenario driver and a concrete browser.
//! Two sessions are provided: [`HttpPage`], which fetches server-rendered
//! documents and inspects them in-process, and [`PlaywrightPage`], which
//! drives a headless browser through a Node bridge.

pub mod dom;
pub mod http;
pub mod playwright;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reelcheck_common::routes::is_static_asset;
use reelcheck_common::{DriverConfig, DriverKind, Target};

use crate::error::E2eResult;
use crate::locator::Locator;

pub use http::HttpPage;
pub use playwright::PlaywrightPage;

/// What a query observed about one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Page lifecycle milestone to wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// Something the session emitted while a scenario ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A document or subresource response
    Response { url: String, status: u16 },
    /// An uncaught error surfaced by the page
    PageError { message: String },
    /// A request that never produced a response
    RequestFailed { url: String, reason: String },
}

/// Append-only record of diagnostics, shared with background readers.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Messages of all page errors seen so far
    pub fn page_errors(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::PageError { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Not-found responses served by `target`, static and icon assets excluded
    pub fn not_found_responses(&self, target: &Target) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Response { url, status: 404 }
                    if target.owns(url) && !is_static_asset(url) =>
                {
                    Some(url.clone())
                }
                _ => None,
            })
            .collect()
    }
}

/// A browser session bound to one scenario.
///
/// Every wait takes an explicit upper bound. Waits report whether their
/// condition was observed instead of failing, so the caller decides what a
/// missed condition means.
#[async_trait]
pub trait Page: Send {
    /// Load `url` as a new history entry
    async fn goto(&mut self, url: &url::Url) -> E2eResult<()>;

    /// Current location, `about:blank` before the first navigation
    async fn url(&mut self) -> E2eResult<String>;

    /// Elements matching `locator` in document order
    async fn query(&mut self, locator: &Locator) -> E2eResult<Vec<ElementInfo>>;

    /// Click the first match. Returns `false` when nothing matched.
    async fn click(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<bool>;

    /// Set the value of the first matching form field
    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<bool>;

    /// Submit the form owning the first match, like pressing Enter in it
    async fn submit(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<bool>;

    /// History back. Returns `false` when there is no previous entry.
    async fn go_back(&mut self, timeout: Duration) -> E2eResult<bool>;

    /// Race visibility of `locators`; index of the first one seen, if any
    async fn wait_for_any(&mut self, locators: &[Locator], timeout: Duration) -> E2eResult<Option<usize>>;

    /// Wait until the URL matches `pattern`
    async fn wait_for_url(&mut self, pattern: &str, timeout: Duration) -> E2eResult<bool>;

    /// Wait for a lifecycle milestone of the current document
    async fn wait_for_load(&mut self, state: LoadState, timeout: Duration) -> E2eResult<bool>;

    /// Keep the session open for `window` so late diagnostics are collected
    async fn observe(&mut self, window: Duration) -> E2eResult<()>;

    /// Diagnostics recorded since the session was opened
    fn diagnostics(&self) -> &DiagnosticLog;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Open a fresh session of the configured kind.
pub async fn open(config: &DriverConfig, target: &Target) -> E2eResult<Box<dyn Page>> {
    match config.kind {
        DriverKind::Http => Ok(Box::new(HttpPage::new(target.clone(), config)?)),
        DriverKind::Playwright => Ok(Box::new(PlaywrightPage::launch(config).await?)),
    }
}

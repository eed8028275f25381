//! Session over plain HTTP for server-rendered documents

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use reelcheck_common::{DriverConfig, Target};

use super::dom::{self, Interaction};
use super::{Diagnostic, DiagnosticLog, ElementInfo, LoadState, Page};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

struct Document {
    url: Url,
    html: String,
}

/// Fetches documents with `reqwest` and inspects them with `scraper`.
///
/// Rendering is whatever the server sent, so readiness races resolve on the
/// first check and observation windows have nothing to wait for. Form
/// values filled in by scenarios are kept until the next document loads.
pub struct HttpPage {
    client: Client,
    target: Target,
    fetch_subresources: bool,
    max_subresources: usize,
    history: Vec<Url>,
    current: Option<Document>,
    values: HashMap<String, String>,
    diagnostics: DiagnosticLog,
}

impl HttpPage {
    pub fn new(target: Target, config: &DriverConfig) -> E2eResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.navigation_timeout)
            .user_agent(concat!("reelcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            target,
            fetch_subresources: config.fetch_subresources,
            max_subresources: config.max_subresources,
            history: Vec::new(),
            current: None,
            values: HashMap::new(),
            diagnostics: DiagnosticLog::new(),
        })
    }

    fn html(&self) -> &str {
        self.current.as_ref().map(|d| d.html.as_str()).unwrap_or_default()
    }

    async fn load(&self, url: &Url) -> E2eResult<Document> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.diagnostics.push(Diagnostic::RequestFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
                return Err(E2eError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| E2eError::Navigation {
            url: final_url.to_string(),
            reason: e.to_string(),
        })?;

        debug!("GET {} -> {}", final_url, status);
        self.diagnostics.push(Diagnostic::Response {
            url: final_url.to_string(),
            status,
        });

        if status >= 500 {
            self.diagnostics.push(Diagnostic::PageError {
                message: format!("{} responded with status {}", final_url, status),
            });
        }
        if let Some(crash) = dom::crash_marker(&html) {
            self.diagnostics.push(Diagnostic::PageError {
                message: format!("{} at {}", crash, final_url),
            });
        }

        if self.fetch_subresources {
            self.load_subresources(&final_url, &html).await;
        }

        Ok(Document { url: final_url, html })
    }

    async fn load_subresources(&self, page_url: &Url, html: &str) {
        let urls: Vec<Url> = dom::subresources(html, page_url)
            .into_iter()
            .filter(|url| self.target.same_origin(url))
            .take(self.max_subresources)
            .collect();

        let client = &self.client;
        let results = join_all(urls.into_iter().map(|url| async move {
            let result = client.get(url.clone()).send().await;
            (url, result)
        }))
        .await;

        for (url, result) in results {
            match result {
                Ok(response) => {
                    debug!("GET {} -> {}", url, response.status());
                    self.diagnostics.push(Diagnostic::Response {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Err(e) => self.diagnostics.push(Diagnostic::RequestFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
    }

    /// Load `url` as a new history entry.
    async fn visit(&mut self, url: Url) -> E2eResult<()> {
        let document = self.load(&url).await?;
        if let Some(previous) = self.current.replace(document) {
            self.history.push(previous.url);
        }
        self.values.clear();
        Ok(())
    }

    async fn interact(&mut self, interaction: Option<Interaction>) -> E2eResult<bool> {
        match interaction {
            None => Ok(false),
            Some(Interaction::Stay) => Ok(true),
            Some(Interaction::Navigate(url)) => {
                self.visit(url).await?;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &Url) -> E2eResult<()> {
        self.visit(url.clone()).await
    }

    async fn url(&mut self) -> E2eResult<String> {
        Ok(self
            .current
            .as_ref()
            .map(|d| d.url.to_string())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn query(&mut self, locator: &Locator) -> E2eResult<Vec<ElementInfo>> {
        dom::query(self.html(), locator)
    }

    async fn click(&mut self, locator: &Locator, _timeout: Duration) -> E2eResult<bool> {
        let Some(document) = &self.current else {
            return Ok(false);
        };
        let interaction = dom::resolve_click(&document.html, &document.url, locator, &self.values)?;
        self.interact(interaction).await
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<bool> {
        match dom::field_name(self.html(), locator)? {
            None => Ok(false),
            Some(None) => Ok(true),
            Some(Some(name)) => {
                self.values.insert(name, value.to_string());
                Ok(true)
            }
        }
    }

    async fn submit(&mut self, locator: &Locator, _timeout: Duration) -> E2eResult<bool> {
        let Some(document) = &self.current else {
            return Ok(false);
        };
        let interaction = dom::resolve_submit(&document.html, &document.url, locator, &self.values)?;
        self.interact(interaction).await
    }

    async fn go_back(&mut self, _timeout: Duration) -> E2eResult<bool> {
        let Some(url) = self.history.pop() else {
            return Ok(false);
        };
        let document = self.load(&url).await?;
        self.current = Some(document);
        self.values.clear();
        Ok(true)
    }

    async fn wait_for_any(&mut self, locators: &[Locator], _timeout: Duration) -> E2eResult<Option<usize>> {
        for (index, locator) in locators.iter().enumerate() {
            if dom::any_visible(self.html(), locator)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    async fn wait_for_url(&mut self, pattern: &str, _timeout: Duration) -> E2eResult<bool> {
        let regex = Regex::new(pattern).map_err(|e| E2eError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let url = self.url().await?;
        Ok(regex.is_match(&url))
    }

    async fn wait_for_load(&mut self, _state: LoadState, _timeout: Duration) -> E2eResult<bool> {
        Ok(self.current.is_some())
    }

    async fn observe(&mut self, _window: Duration) -> E2eResult<()> {
        Ok(())
    }

    fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.current = None;
        self.history.clear();
        self.values.clear();
        Ok(())
    }
}

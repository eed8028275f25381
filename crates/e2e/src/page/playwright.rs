//! Playwright browser automation
//!
//! A Node process runs `bridge.js`, which owns one browser page. Commands
//! and replies travel as JSON lines over the child's stdin/stdout, and page
//! events (responses, uncaught errors, failed requests) are streamed back
//! on the same channel and appended to the session's diagnostics.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use url::Url;

use reelcheck_common::DriverConfig;

use super::{Diagnostic, DiagnosticLog, ElementInfo, LoadState, Page};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Environment variable carrying the bridge's launch settings
const BRIDGE_CONFIG_ENV: &str = "REELCHECK_BRIDGE_CONFIG";

/// Time allowed for node to start and launch the browser
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Slack added to every command's own timeout before the bridge is
/// considered hung
const REPLY_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct BridgeConfig<'a> {
    browser: &'a str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    navigation_timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Goto { url: &'a str },
    Url,
    Query { locator: &'a Locator },
    Click { locator: &'a Locator, timeout_ms: u64 },
    Fill { locator: &'a Locator, value: &'a str },
    Press { locator: &'a Locator, key: &'a str, timeout_ms: u64 },
    Back { timeout_ms: u64 },
    WaitAny { locators: &'a [Locator], timeout_ms: u64 },
    WaitUrl { pattern: &'a str, timeout_ms: u64 },
    WaitLoad { state: LoadState, timeout_ms: u64 },
    Sleep { ms: u64 },
    Close,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    command: BridgeCommand<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    Ready,
    Fatal { message: String },
    Response { url: String, status: u16 },
    PageError { message: String },
    RequestFailed { url: String, reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Incoming {
    Reply(Reply),
    Event(Event),
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;
type Startup = oneshot::Sender<Result<(), String>>;

/// A headless browser page driven through the Playwright bridge
pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    pending: Pending,
    next_id: u64,
    diagnostics: DiagnosticLog,
    reader: JoinHandle<()>,
    navigation_timeout: Duration,
    _workdir: TempDir,
}

impl PlaywrightPage {
    /// Spawn the bridge and wait until its page is ready.
    pub async fn launch(config: &DriverConfig) -> E2eResult<Self> {
        Self::check_playwright_installed().await?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let bridge_config = serde_json::to_string(&BridgeConfig {
            browser: &config.browser,
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            navigation_timeout_ms: config.navigation_timeout.as_millis() as u64,
        })?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = Command::new("node")
            .arg(&script_path)
            .env(BRIDGE_CONFIG_ENV, bridge_config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Browser("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Browser("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let diagnostics = DiagnosticLog::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let reader = tokio::spawn(read_bridge(
            stdout,
            pending.clone(),
            diagnostics.clone(),
            ready_tx,
        ));

        match tokio::time::timeout(STARTUP_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(message))) => return Err(E2eError::Browser(message)),
            Ok(Err(_)) => {
                return Err(E2eError::Browser(
                    "bridge exited before the browser was ready".to_string(),
                ))
            }
            Err(_) => return Err(E2eError::Timeout("browser launch".to_string())),
        }

        Ok(Self {
            child,
            stdin,
            pending,
            next_id: 1,
            diagnostics,
            reader,
            navigation_timeout: config.navigation_timeout,
            _workdir: workdir,
        })
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&mut self, command: BridgeCommand<'_>, timeout: Duration) -> E2eResult<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&Request { id, command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = match tokio::time::timeout(timeout + REPLY_GRACE, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(E2eError::Browser("browser bridge exited".to_string())),
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(E2eError::Timeout(format!("bridge reply to request {}", id)));
            }
        };

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Browser(
                reply.error.unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }

    async fn request_as<T: DeserializeOwned>(
        &mut self,
        command: BridgeCommand<'_>,
        timeout: Duration,
    ) -> E2eResult<T> {
        let value = self.request(command, timeout).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("bridge stderr: {}", line);
    }
}

async fn read_bridge(stdout: ChildStdout, pending: Pending, diagnostics: DiagnosticLog, ready: Startup) {
    let mut ready = Some(ready);
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from browser bridge: {}", e);
                break;
            }
        };

        let incoming = match serde_json::from_str::<Incoming>(&line) {
            Ok(incoming) => incoming,
            Err(_) => {
                debug!("bridge: {}", line);
                continue;
            }
        };

        match incoming {
            Incoming::Reply(reply) => {
                if let Some(tx) = pending.lock().remove(&reply.id) {
                    let _ = tx.send(reply);
                }
            }
            Incoming::Event(Event::Ready) => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Incoming::Event(Event::Fatal { message }) => match ready.take() {
                Some(tx) => {
                    let _ = tx.send(Err(message));
                }
                None => error!("Browser bridge: {}", message),
            },
            Incoming::Event(Event::Response { url, status }) => {
                diagnostics.push(Diagnostic::Response { url, status });
            }
            Incoming::Event(Event::PageError { message }) => {
                debug!("Page error: {}", message);
                diagnostics.push(Diagnostic::PageError { message });
            }
            Incoming::Event(Event::RequestFailed { url, reason }) => {
                diagnostics.push(Diagnostic::RequestFailed { url, reason });
            }
        }
    }

    // Dropping the senders wakes every waiting request with an error.
    pending.lock().clear();
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&mut self, url: &Url) -> E2eResult<()> {
        let timeout = self.navigation_timeout;
        self.request(BridgeCommand::Goto { url: url.as_str() }, timeout)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                E2eError::Browser(reason) => E2eError::Navigation {
                    url: url.to_string(),
                    reason,
                },
                other => other,
            })
    }

    async fn url(&mut self) -> E2eResult<String> {
        let timeout = self.navigation_timeout;
        self.request_as(BridgeCommand::Url, timeout).await
    }

    async fn query(&mut self, locator: &Locator) -> E2eResult<Vec<ElementInfo>> {
        let timeout = self.navigation_timeout;
        self.request_as(BridgeCommand::Query { locator }, timeout).await
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<bool> {
        let command = BridgeCommand::Click {
            locator,
            timeout_ms: millis(timeout),
        };
        self.request_as(command, timeout).await
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<bool> {
        let timeout = self.navigation_timeout;
        self.request_as(BridgeCommand::Fill { locator, value }, timeout).await
    }

    async fn submit(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<bool> {
        let command = BridgeCommand::Press {
            locator,
            key: "Enter",
            timeout_ms: millis(timeout),
        };
        self.request_as(command, timeout).await
    }

    async fn go_back(&mut self, timeout: Duration) -> E2eResult<bool> {
        self.request_as(BridgeCommand::Back { timeout_ms: millis(timeout) }, timeout)
            .await
    }

    async fn wait_for_any(&mut self, locators: &[Locator], timeout: Duration) -> E2eResult<Option<usize>> {
        let command = BridgeCommand::WaitAny {
            locators,
            timeout_ms: millis(timeout),
        };
        self.request_as(command, timeout).await
    }

    async fn wait_for_url(&mut self, pattern: &str, timeout: Duration) -> E2eResult<bool> {
        let command = BridgeCommand::WaitUrl {
            pattern,
            timeout_ms: millis(timeout),
        };
        self.request_as(command, timeout).await
    }

    async fn wait_for_load(&mut self, state: LoadState, timeout: Duration) -> E2eResult<bool> {
        let command = BridgeCommand::WaitLoad {
            state,
            timeout_ms: millis(timeout),
        };
        self.request_as(command, timeout).await
    }

    async fn observe(&mut self, window: Duration) -> E2eResult<()> {
        self.request(BridgeCommand::Sleep { ms: millis(window) }, window)
            .await
            .map(|_| ())
    }

    fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    async fn close(&mut self) -> E2eResult<()> {
        if let Err(e) = self.request(BridgeCommand::Close, Duration::from_secs(5)).await {
            debug!("Bridge did not acknowledge close: {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Bridge exited with {}", status),
            _ => {
                warn!("Browser bridge did not exit, killing it");
                self.child.kill().await?;
            }
        }
        self.reader.abort();
        Ok(())
    }
}

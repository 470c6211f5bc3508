//! DevTools protocol plumbing
//!
//! Two halves: the HTTP discovery endpoints (`/json/version`, `/json`,
//! `/json/new`) and a WebSocket control channel to a single page target.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument};

use crate::error::{AppError, AppResult};

/// Reads the session token from page storage, first non-empty key wins.
pub const TOKEN_PROBE_EXPRESSION: &str = r#"(() => {
    const candidates = [
        localStorage.getItem('puter.auth.token'),
        localStorage.getItem('auth_token'),
        sessionStorage.getItem('puter.auth.token'),
    ];
    return candidates.find((value) => value && value.length > 0) || null;
})()"#;

/// A debugging target as listed by `/json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DebugTarget {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// Client for the DevTools HTTP discovery endpoints
#[derive(Clone)]
pub struct DevToolsClient {
    client: reqwest::Client,
    base_url: String,
}

impl DevToolsClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Whether a browser is answering on the debugging port
    pub async fn is_alive(&self) -> bool {
        let url = format!("{}/json/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "DevTools endpoint unreachable");
                false
            }
        }
    }

    /// List open debugging targets
    pub async fn list_targets(&self) -> AppResult<Vec<DebugTarget>> {
        let url = format!("{}/json", self.base_url);
        let response = self.client.get(&url).send().await.map_err(channel_error)?;
        response.json().await.map_err(channel_error)
    }

    /// Open a new tab at `page_url`.
    ///
    /// Current browsers only accept PUT here; older ones only GET.
    pub async fn open_target(&self, page_url: &str) -> AppResult<DebugTarget> {
        let url = format!("{}/json/new?{}", self.base_url, page_url);

        let response = self.client.put(&url).send().await.map_err(channel_error)?;
        let response = if response.status().is_success() {
            response
        } else {
            debug!(status = %response.status(), "PUT /json/new rejected, retrying with GET");
            self.client.get(&url).send().await.map_err(channel_error)?
        };

        if !response.status().is_success() {
            return Err(AppError::ChannelError(format!(
                "could not open a tab for {} (HTTP {})",
                page_url,
                response.status()
            )));
        }

        response.json().await.map_err(channel_error)
    }

    /// Reuse a page already showing `site_url`, else open one.
    #[instrument(skip(self))]
    pub async fn find_or_open(&self, site_url: &str) -> AppResult<DebugTarget> {
        let host = reqwest::Url::parse(site_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| site_url.to_string());

        let targets = self.list_targets().await?;
        if let Some(existing) = targets
            .into_iter()
            .find(|t| (t.kind.is_empty() || t.kind == "page") && t.url.contains(&host))
        {
            debug!(target_id = %existing.id, url = %existing.url, "Found existing tab");
            return Ok(existing);
        }

        debug!(url = %site_url, "Opening new tab");
        self.open_target(site_url).await
    }
}

/// WebSocket connection to one page target.
///
/// Commands are correlated to replies by a per-channel counter; only one
/// probe is in flight at a time.
pub struct ControlChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    probe_timeout: Duration,
}

impl ControlChannel {
    /// Connect to the target's debugger URL
    pub async fn connect(target: &DebugTarget, probe_timeout: Duration) -> AppResult<Self> {
        let ws_url = target.web_socket_debugger_url.as_deref().ok_or_else(|| {
            AppError::ChannelError(format!(
                "target {} has no debugger URL (is DevTools already attached?)",
                target.id
            ))
        })?;

        let (socket, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(channel_error)?;

        debug!(url = %ws_url, "Control channel connected");
        Ok(Self {
            socket,
            next_id: 1,
            probe_timeout,
        })
    }

    /// Ask the page for its session token.
    ///
    /// `Ok(None)` means "not there yet": the storage keys were empty, the
    /// evaluation failed in the page, or no reply arrived within the probe
    /// timeout.
    pub async fn probe_token(&mut self) -> AppResult<Option<String>> {
        let id = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": TOKEN_PROBE_EXPRESSION,
                    "returnByValue": true,
                }),
            )
            .await?;

        let probe_timeout = self.probe_timeout;
        let socket = &mut self.socket;
        let reply = async {
            while let Some(frame) = socket.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => return Err(channel_error(e)),
                };
                let Ok(message) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                if message.get("id").and_then(Value::as_u64) == Some(id) {
                    return Ok(probe_value(&message));
                }
            }
            Err(AppError::ChannelError("control channel closed".to_string()))
        };

        match tokio::time::timeout(probe_timeout, reply).await {
            Ok(result) => result,
            Err(_) => {
                debug!(id, "Token probe timed out");
                Ok(None)
            }
        }
    }

    async fn send_command(&mut self, method: &str, params: Value) -> AppResult<u64> {
        let id = self.next_id;
        self.next_id += 1;

        let payload = json!({ "id": id, "method": method, "params": params });
        self.socket
            .send(Message::Text(payload.to_string().into()))
            .await
            .map_err(channel_error)?;
        Ok(id)
    }

    /// Close the channel, ignoring errors from an already-dead socket
    pub async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(error = %e, "Control channel close failed");
        }
    }
}

fn probe_value(reply: &Value) -> Option<String> {
    reply
        .pointer("/result/result/value")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn channel_error(e: impl std::fmt::Display) -> AppError {
    AppError::ChannelError(e.to_string())
}

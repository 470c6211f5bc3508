//! Common test utilities for the proxy
//!
//! Shared fixtures: fake credential sources, an upstream mock server wired
//! into a real router, and a stand-in DevTools page socket.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::MockServer;

use puter_proxy::error::{AppError, AppResult};
use puter_proxy::{routes, AppState, Config, Credential, CredentialSource};

/// Hands out `token-1`, `token-2`, ... and counts acquisitions and resets
#[derive(Default)]
pub struct FakeSource {
    acquired: AtomicUsize,
    resets: AtomicUsize,
}

impl FakeSource {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for FakeSource {
    async fn acquire(&self) -> AppResult<Credential> {
        let n = self.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(format!("token-{}", n)))
    }

    async fn reset_identity(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source whose acquisition always times out
pub struct UnavailableSource;

#[async_trait]
impl CredentialSource for UnavailableSource {
    async fn acquire(&self) -> AppResult<Credential> {
        Err(AppError::AcquisitionTimeout(
            "no session token appeared within 0s".to_string(),
        ))
    }

    async fn reset_identity(&self) {}
}

/// Config pointing the upstream client at `upstream_url`
pub fn test_config(upstream_url: &str) -> Config {
    Config {
        port: 0,
        puter_api_url: upstream_url.to_string(),
        auth_on_startup: false,
        ..Config::default()
    }
}

/// Router-backed test harness around a mock upstream
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub upstream: MockServer,
}

impl TestApp {
    pub async fn with_source(source: Arc<dyn CredentialSource>) -> Self {
        let upstream = MockServer::start().await;
        let state = Arc::new(AppState::from_parts(
            test_config(&upstream.uri()),
            reqwest::Client::new(),
            source,
        ));
        let server = TestServer::new(routes::create_router(state.clone()))
            .expect("Failed to create test server");

        Self {
            server,
            state,
            upstream,
        }
    }
}

/// Minimal chat request body
pub fn chat_body(model: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": "You are terse."},
            {"role": "user", "content": "Say hello"}
        ],
        "stream": stream
    })
}

/// Split an SSE body into its `data:` payloads
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|event| event.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

/// Serve one DevTools page socket answering token probes with `replies`
/// in order, then with "no token" forever. Returns the socket URL.
pub async fn spawn_page_socket(replies: Vec<Option<&'static str>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut replies = replies.into_iter();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let request: Value = serde_json::from_str(text.as_str()).unwrap();
            let value = replies.next().flatten();
            let reply = json!({
                "id": request["id"],
                "result": {"result": {"type": "string", "value": value}}
            });
            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    format!("ws://{}/devtools/page/PUTER", addr)
}

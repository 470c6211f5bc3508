//! Puter Proxy - local OpenAI-compatible gateway to Puter's chat drivers
//!
//! Requests arrive in the OpenAI chat-completions schema, are translated into
//! upstream driver calls and authorized with a session token harvested from
//! a local browser over the DevTools protocol. A call rejected for
//! credential reasons triggers one session refresh and one replay.

pub mod aliases;
pub mod browser;
pub mod chat;
pub mod config;
pub mod error;
pub mod retry;
pub mod routes;
pub mod session;
pub mod streaming;
pub mod upstream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::browser::{AcquireSettings, CredentialAcquirer};
pub use crate::config::Config;
pub use crate::session::{Credential, CredentialSource, SessionController};
pub use crate::upstream::UpstreamClient;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Owner of the current session credential
    pub session: Arc<SessionController>,
    /// Upstream driver client
    pub upstream: Arc<UpstreamClient>,
    pub start_time: Instant,
}

impl AppState {
    /// Create the application state with a browser-backed credential source
    pub fn new(config: Config) -> Result<Self> {
        // Streams can stay open for minutes, so only connecting is bounded
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(16)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let acquirer = CredentialAcquirer::new(
            http_client.clone(),
            config.browser,
            AcquireSettings::from_config(&config),
        );

        Ok(Self::from_parts(config, http_client, Arc::new(acquirer)))
    }

    /// Assemble the state around an arbitrary credential source
    pub fn from_parts(
        config: Config,
        http_client: reqwest::Client,
        source: Arc<dyn CredentialSource>,
    ) -> Self {
        let session = Arc::new(SessionController::new(source));
        let upstream = Arc::new(UpstreamClient::new(http_client, &config));

        Self {
            config,
            session,
            upstream,
            start_time: Instant::now(),
        }
    }
}

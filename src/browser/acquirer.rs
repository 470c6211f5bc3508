//! Session token acquisition
//!
//! Makes sure a debuggable browser is running, attaches to a tab on the
//! target site and polls page storage until the web app has written its
//! session token.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::cdp::{ControlChannel, DevToolsClient};
use super::{launcher, BrowserVariant};
use crate::{
    config::Config,
    error::{AppError, AppResult},
    session::{Credential, CredentialSource},
};

/// Endpoints, paths and timings used during acquisition
#[derive(Debug, Clone)]
pub struct AcquireSettings {
    /// DevTools HTTP endpoint
    pub debug_url: String,
    /// Page whose storage holds the token
    pub site_url: String,
    /// Profile directory passed to a freshly launched browser
    pub profile_dir: PathBuf,
    /// Explicit browser executable
    pub browser_path: Option<PathBuf>,
    /// Pause after launching the browser before talking to it
    pub warmup: Duration,
    /// Delay between token probes
    pub poll_interval: Duration,
    /// How long a single probe waits for its reply
    pub probe_timeout: Duration,
    /// Absolute bound on the whole polling phase
    pub timeout: Duration,
    /// Pause between killing the browser and deleting its profile
    pub reset_settle: Duration,
}

impl AcquireSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debug_url: config.debug_url.clone(),
            site_url: config.puter_site_url.clone(),
            profile_dir: config.profile_dir(),
            browser_path: config.browser_path.clone(),
            warmup: Duration::from_secs(3),
            poll_interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(1),
            timeout: config.auth_timeout,
            reset_settle: Duration::from_secs(2),
        }
    }

    fn debug_port(&self) -> u16 {
        reqwest::Url::parse(&self.debug_url)
            .ok()
            .and_then(|url| url.port_or_known_default())
            .unwrap_or(9222)
    }
}

/// Harvests the session token from a browser over DevTools
pub struct CredentialAcquirer {
    variant: BrowserVariant,
    settings: AcquireSettings,
    devtools: DevToolsClient,
}

impl CredentialAcquirer {
    pub fn new(client: reqwest::Client, variant: BrowserVariant, settings: AcquireSettings) -> Self {
        let devtools = DevToolsClient::new(client, settings.debug_url.clone());
        Self {
            variant,
            settings,
            devtools,
        }
    }

    /// Run the full acquisition protocol once.
    #[instrument(skip(self), fields(browser = %self.variant))]
    pub async fn acquire_token(&self) -> AppResult<Credential> {
        self.ensure_browser().await?;

        let target = self.devtools.find_or_open(&self.settings.site_url).await?;
        let mut channel = ControlChannel::connect(&target, self.settings.probe_timeout).await?;

        let outcome = tokio::time::timeout(
            self.settings.timeout,
            poll_for_token(&mut channel, self.settings.poll_interval),
        )
        .await;
        channel.close().await;

        match outcome {
            Ok(Ok(token)) => {
                info!("Session token captured");
                Ok(Credential::new(token))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AppError::AcquisitionTimeout(format!(
                "no session token appeared within {}s; log in to {} in the browser",
                self.settings.timeout.as_secs(),
                self.settings.site_url
            ))),
        }
    }

    /// Attach to a running browser, or launch one.
    async fn ensure_browser(&self) -> AppResult<()> {
        if self.devtools.is_alive().await {
            info!(debug_url = %self.settings.debug_url, "Found running browser");
            return Ok(());
        }

        warn!(debug_url = %self.settings.debug_url, "No debuggable browser found, launching one");
        let executable =
            launcher::locate_executable(self.variant, self.settings.browser_path.as_deref())?;
        launcher::launch_detached(
            &executable,
            self.settings.debug_port(),
            &self.settings.profile_dir,
            &self.settings.site_url,
        )?;

        tokio::time::sleep(self.settings.warmup).await;
        Ok(())
    }
}

/// Probe immediately, then once per `interval` until a token shows up.
///
/// Unbounded on its own; the caller owns the deadline.
async fn poll_for_token(channel: &mut ControlChannel, interval: Duration) -> AppResult<String> {
    if let Some(token) = channel.probe_token().await? {
        return Ok(token);
    }

    info!("Waiting for login (checking every {}s)", interval.as_secs_f32());
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        if let Some(token) = channel.probe_token().await? {
            return Ok(token);
        }
    }
}

#[async_trait]
impl CredentialSource for CredentialAcquirer {
    async fn acquire(&self) -> AppResult<Credential> {
        self.acquire_token().await
    }

    async fn reset_identity(&self) {
        if self.variant.supports_profile_reset() {
            launcher::reset_profile(
                self.variant,
                &self.settings.profile_dir,
                self.settings.reset_settle,
            )
            .await;
        }
    }
}

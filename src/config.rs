//! Configuration management for the proxy
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::BrowserVariant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Browser used to harvest the session token
    pub browser: BrowserVariant,
    /// Explicit browser executable, bypassing the known install locations
    pub browser_path: Option<PathBuf>,
    /// DevTools HTTP endpoint of the controlled browser
    pub debug_url: String,
    /// Directory holding the per-browser profile directories
    pub profile_root: PathBuf,

    /// Upstream API origin
    pub puter_api_url: String,
    /// Site the browser session lives on (also sent as Origin/Referer)
    pub puter_site_url: String,

    /// Absolute bound on waiting for a token to appear
    pub auth_timeout: Duration,
    /// Acquire a credential in the background as soon as the server starts
    pub auth_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            browser: BrowserVariant::Chrome,
            browser_path: None,
            debug_url: "http://127.0.0.1:9222".to_string(),
            profile_root: PathBuf::from("."),
            puter_api_url: "https://api.puter.com".to_string(),
            puter_site_url: "https://puter.com".to_string(),
            auth_timeout: Duration::from_secs(300),
            auth_on_startup: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: match env::var("PORT") {
                Ok(port) => port.parse().context("Invalid PORT")?,
                Err(_) => defaults.port,
            },

            browser: match env::var("BROWSER") {
                Ok(browser) => browser.parse().context("Invalid BROWSER")?,
                Err(_) => defaults.browser,
            },
            browser_path: env::var("BROWSER_PATH").ok().map(PathBuf::from),
            debug_url: env::var("DEBUG_URL").unwrap_or(defaults.debug_url),
            profile_root: env::var("PROFILE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_root),

            puter_api_url: env::var("PUTER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.puter_api_url),
            puter_site_url: env::var("PUTER_SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.puter_site_url),

            auth_timeout: match env::var("AUTH_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(secs.parse().context("Invalid AUTH_TIMEOUT_SECS")?),
                Err(_) => defaults.auth_timeout,
            },
            auth_on_startup: env::var("AUTH_ON_STARTUP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.auth_on_startup),
        })
    }

    /// Profile directory used by the configured browser
    pub fn profile_dir(&self) -> PathBuf {
        self.browser.profile_dir(&self.profile_root)
    }

    /// Base URL clients should point their OpenAI SDK at
    pub fn public_base_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.port)
    }
}

//! Browser-side credential acquisition
//!
//! The upstream service only accepts the session token that its web app keeps
//! in browser storage. This module drives a local Chromium-family browser over
//! the DevTools protocol to read that token.

pub mod acquirer;
pub mod cdp;
pub mod launcher;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use acquirer::{AcquireSettings, CredentialAcquirer};
pub use cdp::{ControlChannel, DebugTarget, DevToolsClient};

/// Supported browsers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserVariant {
    Chrome,
    Edge,
}

impl BrowserVariant {
    /// Short lowercase name, also used for the profile directory
    pub fn name(&self) -> &'static str {
        match self {
            BrowserVariant::Chrome => "chrome",
            BrowserVariant::Edge => "edge",
        }
    }

    /// Whether refreshing the session wipes the browser profile.
    ///
    /// Edge sessions run on throwaway anonymous accounts; deleting the profile
    /// makes the site mint a new one on the next visit.
    pub fn supports_profile_reset(&self) -> bool {
        matches!(self, BrowserVariant::Edge)
    }

    /// Dedicated profile directory under `root`
    pub fn profile_dir(&self, root: &Path) -> PathBuf {
        root.join(format!("{}-profile", self.name()))
    }

    /// OS process image name used when terminating the browser
    pub fn process_name(&self) -> &'static str {
        #[cfg(windows)]
        let name = match self {
            BrowserVariant::Chrome => "chrome.exe",
            BrowserVariant::Edge => "msedge.exe",
        };
        #[cfg(target_os = "macos")]
        let name = match self {
            BrowserVariant::Chrome => "Google Chrome",
            BrowserVariant::Edge => "Microsoft Edge",
        };
        #[cfg(all(unix, not(target_os = "macos")))]
        let name = match self {
            BrowserVariant::Chrome => "chrome",
            BrowserVariant::Edge => "msedge",
        };
        name
    }

    /// Known install locations, most likely first
    pub fn executable_candidates(&self) -> Vec<PathBuf> {
        #[cfg(windows)]
        {
            let local_app_data = std::env::var("LOCALAPPDATA").unwrap_or_default();
            match self {
                BrowserVariant::Chrome => vec![
                    PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
                    PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
                    PathBuf::from(local_app_data).join(r"Google\Chrome\Application\chrome.exe"),
                ],
                BrowserVariant::Edge => vec![
                    PathBuf::from(r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe"),
                    PathBuf::from(r"C:\Program Files\Microsoft\Edge\Application\msedge.exe"),
                    PathBuf::from(local_app_data).join(r"Microsoft\Edge\Application\msedge.exe"),
                ],
            }
        }
        #[cfg(target_os = "macos")]
        {
            match self {
                BrowserVariant::Chrome => vec![PathBuf::from(
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                )],
                BrowserVariant::Edge => vec![PathBuf::from(
                    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
                )],
            }
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            match self {
                BrowserVariant::Chrome => vec![
                    PathBuf::from("/usr/bin/google-chrome"),
                    PathBuf::from("/usr/bin/google-chrome-stable"),
                    PathBuf::from("/usr/bin/chromium"),
                    PathBuf::from("/usr/bin/chromium-browser"),
                ],
                BrowserVariant::Edge => vec![
                    PathBuf::from("/usr/bin/microsoft-edge"),
                    PathBuf::from("/usr/bin/microsoft-edge-stable"),
                ],
            }
        }
    }
}

impl fmt::Display for BrowserVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserVariant::Chrome => f.write_str("Google Chrome"),
            BrowserVariant::Edge => f.write_str("Microsoft Edge"),
        }
    }
}

impl FromStr for BrowserVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "google-chrome" | "1" => Ok(BrowserVariant::Chrome),
            "edge" | "msedge" | "2" => Ok(BrowserVariant::Edge),
            other => Err(anyhow::anyhow!(
                "unknown browser '{}', expected 'chrome' or 'edge'",
                other
            )),
        }
    }
}

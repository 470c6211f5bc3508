//! Browser process management
//!
//! Finds and launches the browser with remote debugging enabled, and wipes its
//! profile when a fresh anonymous identity is needed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use tracing::{debug, info, warn};

use super::BrowserVariant;
use crate::error::{AppError, AppResult};

/// Pick the browser executable to launch.
///
/// An explicit override is the only candidate when present; otherwise the
/// variant's known install locations are tried in order.
pub fn locate_executable(
    variant: BrowserVariant,
    override_path: Option<&Path>,
) -> AppResult<PathBuf> {
    let candidates = match override_path {
        Some(path) => vec![path.to_path_buf()],
        None => variant.executable_candidates(),
    };

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            AppError::BrowserNotFound(format!(
                "could not find {}; start it manually with --remote-debugging-port",
                variant
            ))
        })
}

/// Spawn the browser fully detached from this process and return its pid.
///
/// Stdio is not piped and the browser keeps running after the proxy exits.
/// A background task waits on the child so an early exit gets reaped.
/// Must be called from within the runtime.
pub fn launch_detached(
    executable: &Path,
    debug_port: u16,
    profile_dir: &Path,
    site_url: &str,
) -> AppResult<Option<u32>> {
    let mut command = Command::new(executable);
    command
        .arg(format!("--remote-debugging-port={}", debug_port))
        .arg(format!("--user-data-dir={}", profile_dir.display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg(site_url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "failed to launch {}: {}",
            executable.display(),
            e
        ))
    })?;

    let pid = child.id();
    info!(
        executable = %executable.display(),
        pid = ?pid,
        profile = %profile_dir.display(),
        "Launched browser"
    );

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => info!(pid = ?pid, status = %status, "Browser process exited"),
            Err(e) => warn!(pid = ?pid, error = %e, "Failed to wait on browser process"),
        }
    });

    Ok(pid)
}

/// Kill every process of `variant` and delete its profile directory.
///
/// Never fails: a browser that is not running, a missing directory or a
/// profile still locked by a straggling process are all logged and skipped.
pub async fn reset_profile(variant: BrowserVariant, profile_dir: &Path, settle: Duration) {
    info!(browser = %variant, profile = %profile_dir.display(), "Clearing browser profile");

    terminate_processes(variant).await;
    tokio::time::sleep(settle).await;
    remove_profile_dir(profile_dir).await;
}

async fn remove_profile_dir(profile_dir: &Path) {
    match tokio::fs::remove_dir_all(profile_dir).await {
        Ok(()) => info!(profile = %profile_dir.display(), "Browser profile cleared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(profile = %profile_dir.display(), "No browser profile to clear");
        }
        Err(e) => warn!(
            profile = %profile_dir.display(),
            error = %e,
            "Could not clear browser profile (might be in use)"
        ),
    }
}

async fn terminate_processes(variant: BrowserVariant) {
    #[cfg(windows)]
    let mut command = {
        let mut command = tokio::process::Command::new("taskkill");
        command.args(["/F", "/IM", variant.process_name()]);
        command
    };
    #[cfg(not(windows))]
    let mut command = {
        let mut command = tokio::process::Command::new("pkill");
        command.args(["-x", variant.process_name()]);
        command
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match command.status().await {
        Ok(status) => debug!(browser = %variant, status = %status, "Browser termination finished"),
        Err(e) => debug!(browser = %variant, error = %e, "Browser termination unavailable"),
    }
}

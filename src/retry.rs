//! Credential-failure classification and the refresh-and-replay policy
//!
//! Upstream does not report an expired or exhausted session in any single
//! well-defined way, so recognizing one is a best-effort heuristic over the
//! structured `delegate` field and a handful of known message fragments.
//! New upstream wording will slip through as an ordinary upstream error.

use std::future::Future;

use serde_json::Value;
use tracing::warn;

use crate::{
    error::{AppError, AppResult, UpstreamFailure},
    session::{Credential, SessionController},
};

/// Delegate reported when the anonymous account ran out of quota
pub const USAGE_LIMITED_DELEGATE: &str = "usage-limited-chat";

/// Message fragments that mean the current token is no longer usable
pub const CREDENTIAL_FAILURE_MARKERS: &[&str] = &[
    "usage-limited",
    "Permission denied",
    "invalid json response body",
    "Forbidden",
];

fn mentions_marker(text: &str) -> bool {
    CREDENTIAL_FAILURE_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

/// Classify a decoded upstream error body.
pub fn classify_body(body: &Value) -> bool {
    let delegate = body
        .pointer("/error/delegate")
        .or_else(|| body.get("delegate"))
        .and_then(Value::as_str);
    if delegate == Some(USAGE_LIMITED_DELEGATE) {
        return true;
    }

    [body.get("message"), body.pointer("/error/message")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .any(mentions_marker)
}

/// Whether `failure` means the credential must be replaced
pub fn classify(failure: &UpstreamFailure) -> bool {
    failure.body.as_ref().is_some_and(classify_body) || mentions_marker(&failure.message)
}

/// Only upstream failures are ever credential failures.
pub fn is_credential_failure(error: &AppError) -> bool {
    error.upstream_failure().is_some_and(classify)
}

/// Run `attempt` with the current credential, refreshing and replaying once
/// when upstream rejects that credential.
///
/// The replay's outcome is returned as is, so one client request never costs
/// more than two upstream calls or one refresh.
pub async fn with_credential_retry<T, F, Fut>(
    session: &SessionController,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let credential = session.get().await?;

    match attempt(credential.clone()).await {
        Err(e) if is_credential_failure(&e) => {
            warn!(error = %e, "Upstream rejected the session credential, refreshing");
            let fresh = session.refresh_stale(&credential).await?;
            attempt(fresh).await
        }
        result => result,
    }
}

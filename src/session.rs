//! Session credential ownership
//!
//! The [`SessionController`] holds the single current bearer token and hands
//! it to request handlers. Acquisition and refresh are serialized behind one
//! lock so concurrent callers that hit a dead token share a single browser
//! round-trip instead of each relaunching the browser.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::error::AppResult;

/// Opaque upstream bearer token.
///
/// There is no local expiry: a token is good until upstream rejects it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters, safe to log
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(10).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.preview()).finish()
    }
}

/// Something that can mint a fresh session token
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Obtain a token, blocking until one is available or the source gives up.
    async fn acquire(&self) -> AppResult<Credential>;

    /// Throw away the identity behind the current token so the next
    /// `acquire` yields a different one. Sources that cannot do this are a
    /// no-op.
    async fn reset_identity(&self);
}

/// Owner of the current credential
pub struct SessionController {
    source: Arc<dyn CredentialSource>,
    current: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl SessionController {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current credential, acquiring one on first use
    pub async fn get(&self) -> AppResult<Credential> {
        if let Some(credential) = self.current.read().await.clone() {
            return Ok(credential);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(credential) = self.current.read().await.clone() {
            return Ok(credential);
        }

        let credential = self.source.acquire().await?;
        *self.current.write().await = Some(credential.clone());
        info!(token = %credential.preview(), "Session credential acquired");
        Ok(credential)
    }

    /// Discard the current credential and acquire a new one.
    pub async fn refresh(&self) -> AppResult<Credential> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Replace `stale` after upstream rejected it.
    ///
    /// When another caller already swapped the credential while this one was
    /// waiting for the lock, that newer credential is returned as is.
    pub async fn refresh_stale(&self, stale: &Credential) -> AppResult<Credential> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.current.read().await.as_ref() {
            if current != stale {
                debug!(token = %current.preview(), "Credential already refreshed by another request");
                return Ok(current.clone());
            }
        }

        self.refresh_locked().await
    }

    /// Whether a credential is currently held
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    #[instrument(skip(self))]
    async fn refresh_locked(&self) -> AppResult<Credential> {
        info!("Refreshing session credential");
        self.current.write().await.take();

        self.source.reset_identity().await;
        let credential = self.source.acquire().await?;

        *self.current.write().await = Some(credential.clone());
        info!(token = %credential.preview(), "Session credential refreshed");
        Ok(credential)
    }
}

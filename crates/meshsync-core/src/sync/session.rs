//! Short-lived provider sessions.

use crate::error::{MeshError, Result};
use reqwest::{header, Client};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, warn};
use url::Url;

/// Header carrying the session token on authenticated requests.
pub const AUTH_HEADER: &str = "X-Auth";

/// A provider session token.
///
/// A session belongs to the call that acquired it and must be handed back
/// through [`SessionCache::release`] (or an adapter's `release_session`)
/// exactly once. Dropping an unreleased session logs a warning.
#[derive(Debug)]
pub struct SyncSession {
    token: String,
    released: bool,
}

impl SyncSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            released: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Mark the session as released and hand out its token.
    fn into_token(mut self) -> String {
        self.released = true;
        std::mem::take(&mut self.token)
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        if !self.released {
            warn!("Provider session dropped without being released");
        }
    }
}

/// Acquires and releases sessions against one provider.
///
/// The acquire endpoint takes the credentials as query parameters and
/// answers `{"results": [token]}`; the release endpoint takes the token in
/// the [`AUTH_HEADER`]. Sessions are never reused between calls.
pub struct SessionCache {
    client: Client,
    provider: String,
    acquire_url: Url,
    release_url: Url,
    outstanding: AtomicUsize,
}

impl SessionCache {
    pub fn new(
        client: Client,
        provider: impl Into<String>,
        acquire_url: Url,
        release_url: Url,
    ) -> Self {
        Self {
            client,
            provider: provider.into(),
            acquire_url,
            release_url,
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Number of sessions acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Authenticate and return a new session.
    ///
    /// Transport failures, non-2xx answers and bodies without a token are
    /// all [`MeshError::Authentication`].
    pub async fn acquire(&self) -> Result<SyncSession> {
        debug!(provider = %self.provider, "Authenticating");

        let response = self
            .client
            .get(self.acquire_url.clone())
            .send()
            .await
            .map_err(|e| self.auth_error(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.auth_error(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(self.auth_error(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let token = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("results")
                    .and_then(|r| r.get(0))
                    .and_then(|t| t.as_str())
                    .map(str::to_string)
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.auth_error("response carries no session token"))?;

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(SyncSession::new(token))
    }

    /// Hand a session back to the provider.
    ///
    /// The session is consumed whatever the provider answers.
    pub async fn release(&self, session: SyncSession) -> Result<()> {
        let token = session.into_token();
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok();

        let response = self
            .client
            .get(self.release_url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .header(AUTH_HEADER, token)
            .send()
            .await
            .map_err(|e| MeshError::Network {
                message: format!("Failed to release {} session: {}", self.provider, e),
                cause: None,
            })?;

        if !response.status().is_success() {
            return Err(MeshError::RemoteProtocol {
                status: Some(response.status().as_u16()),
                message: format!("{} refused to release the session", self.provider),
            });
        }
        Ok(())
    }

    fn auth_error(&self, message: impl Into<String>) -> MeshError {
        let message = message.into();
        error!(provider = %self.provider, "Authentication failed: {}", message);
        MeshError::Authentication {
            provider: self.provider.clone(),
            message,
        }
    }
}

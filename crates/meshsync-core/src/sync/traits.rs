//! The capability every provider adapter implements.

use super::{ConvertMode, SyncNode, SyncOutcome, SyncSession};
use crate::error::Result;
use async_trait::async_trait;

/// A provider adapter.
///
/// Errors returned by these methods are configuration or authentication
/// problems, or a node that cannot be converted. Anything the provider
/// rejects is reported as [`SyncOutcome::Rejected`].
#[async_trait]
pub trait Synchronizer: Send + Sync {
    /// Registry name of the provider.
    fn provider(&self) -> &str;

    /// Check that every required setting is present. Runs before any request.
    fn validate_config(&self) -> Result<()>;

    /// Authenticate and return a fresh session.
    async fn get_session(&self) -> Result<SyncSession>;

    /// Give a session back to the provider. Consumes it.
    async fn release_session(&self, session: SyncSession) -> Result<()>;

    /// Build the provider envelope for `node`.
    fn convert_format(&self, node: &SyncNode, mode: ConvertMode) -> Result<serde_json::Value>;

    /// Create a remote record for `node`.
    async fn add(&self, node: &SyncNode) -> Result<SyncOutcome>;

    /// Update the remote record of `node`.
    async fn change(&self, node: &SyncNode) -> Result<SyncOutcome>;

    /// Delete a remote record.
    async fn delete(&self, external_id: &str) -> Result<SyncOutcome>;

    /// Verify that the adapter can authenticate.
    async fn clean(&self) -> Result<()> {
        let session = self.get_session().await?;
        self.release_session(session).await
    }
}

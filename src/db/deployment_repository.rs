use async_trait::async_trait;
use thiserror::Error;

use crate::models::deployment::Deployment;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("deployment store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("deployment store is corrupt: {0}")]
    Corrupt(String),
    #[error("failed to serialize deployments: {0}")]
    Serialize(String),
}

/// Durable home of the full deployment collection.
///
/// Every write replaces the whole collection; there is no record-level patching.
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    /// Returns an empty collection when nothing has been persisted yet.
    async fn load_all(&self) -> Result<Vec<Deployment>, StoreError>;

    async fn save_all(&self, deployments: &[Deployment]) -> Result<(), StoreError>;

    /// Whether any durable state exists at all (used by startup recovery).
    async fn exists(&self) -> Result<bool, StoreError>;
}

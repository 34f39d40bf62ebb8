use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::deployment_repository::{DeploymentRepository, StoreError};
use crate::models::deployment::Deployment;

/// Serialises read-modify-write cycles over a [`DeploymentRepository`].
///
/// The repository only knows how to replace the whole collection, so two interleaved
/// mutations would otherwise lose one of the writes. Every mutation goes through
/// [`DeploymentStore::modify`], which holds the write lock from load to save. The lock does
/// not protect against other processes writing the same file.
pub struct DeploymentStore {
    repo: Arc<dyn DeploymentRepository>,
    write_lock: Mutex<()>,
}

impl DeploymentStore {
    pub fn new(repo: Arc<dyn DeploymentRepository>) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn read(&self) -> Result<Vec<Deployment>, StoreError> {
        self.repo.load_all().await
    }

    pub async fn exists(&self) -> Result<bool, StoreError> {
        self.repo.exists().await
    }

    /// Loads the collection, applies `mutate`, and saves the result if `mutate` returned `Ok`.
    ///
    /// `mutate` is synchronous so no other task can observe the collection between load and
    /// save. An `Err` from `mutate` skips the save.
    pub async fn modify<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<Deployment>) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.modify_with(mutate, |_| {}).await
    }

    /// Like [`DeploymentStore::modify`], but runs `on_saved` after a successful save while the
    /// write lock is still held. Side effects that must agree with the persisted state (timers)
    /// go there so a failed save leaves them untouched.
    pub async fn modify_with<T, E, F, G>(&self, mutate: F, on_saved: G) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<Deployment>) -> Result<T, E>,
        G: FnOnce(&T),
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut deployments = self.repo.load_all().await?;
        let outcome = mutate(&mut deployments)?;
        self.repo.save_all(&deployments).await?;
        on_saved(&outcome);
        Ok(outcome)
    }

    /// Writes an empty collection, used when no durable state exists yet.
    pub async fn initialize_empty(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.repo.save_all(&[]).await
    }
}

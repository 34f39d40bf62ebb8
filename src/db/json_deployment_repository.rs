use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::db::deployment_repository::{DeploymentRepository, StoreError};
use crate::models::deployment::Deployment;

/// Stores the deployment collection as a pretty-printed JSON array in a single file.
pub struct JsonDeploymentRepository {
    pub path: PathBuf,
}

impl JsonDeploymentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "deployments.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[async_trait]
impl DeploymentRepository for JsonDeploymentRepository {
    async fn load_all(&self) -> Result<Vec<Deployment>, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    async fn save_all(&self, deployments: &[Deployment]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(deployments)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        ensure_parent(&self.path).await?;
        // Write next to the target and rename so readers never observe a half-written file.
        let tmp = self.temp_path();
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(
            count = deployments.len(),
            path = %self.path.display(),
            "Saved deployments"
        );
        Ok(())
    }

    async fn exists(&self) -> Result<bool, StoreError> {
        Ok(fs::try_exists(&self.path).await?)
    }
}

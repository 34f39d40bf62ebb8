use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

use crate::models::workflow::{WorkflowDefinition, WorkflowTemplate};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read workflow catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("workflow catalog is malformed: {0}")]
    Malformed(String),
}

/// Read-only source of workflow templates. Deployments reference templates but never own them.
#[async_trait]
pub trait WorkflowCatalog: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<WorkflowTemplate>, CatalogError>;

    async fn find_template(&self, template_id: &str)
        -> Result<Option<WorkflowTemplate>, CatalogError>;

    async fn find_definition(
        &self,
        template_id: &str,
    ) -> Result<Option<WorkflowDefinition>, CatalogError> {
        Ok(self
            .find_template(template_id)
            .await?
            .as_ref()
            .map(WorkflowDefinition::from))
    }
}

/// Reads `workflows.json` on every lookup so template edits apply without a restart.
pub struct JsonWorkflowCatalog {
    pub path: PathBuf,
}

impl JsonWorkflowCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WorkflowCatalog for JsonWorkflowCatalog {
    async fn list_templates(&self) -> Result<Vec<WorkflowTemplate>, CatalogError> {
        let content = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content)
            .map_err(|e| CatalogError::Malformed(format!("{}: {}", self.path.display(), e)))
    }

    async fn find_template(
        &self,
        template_id: &str,
    ) -> Result<Option<WorkflowTemplate>, CatalogError> {
        Ok(self
            .list_templates()
            .await?
            .into_iter()
            .find(|t| t.template_id == template_id))
    }
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::deployment_repository::{DeploymentRepository, StoreError};
use crate::db::workflow_catalog::{CatalogError, WorkflowCatalog};
use crate::models::deployment::Deployment;
use crate::models::workflow::WorkflowTemplate;

/// In-memory deployment repository that records how often it was written.
#[derive(Default)]
pub struct InMemoryDeploymentRepository {
    pub deployments: Mutex<Option<Vec<Deployment>>>,
    pub saves: Mutex<usize>,
    pub should_fail: bool,
}

impl InMemoryDeploymentRepository {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn seed(&self, deployments: Vec<Deployment>) {
        *self.deployments.lock().unwrap() = Some(deployments);
    }

    pub fn snapshot(&self) -> Vec<Deployment> {
        self.deployments.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl DeploymentRepository for InMemoryDeploymentRepository {
    async fn load_all(&self) -> Result<Vec<Deployment>, StoreError> {
        if self.should_fail {
            return Err(StoreError::Io(std::io::Error::other("Mock store failure")));
        }
        Ok(self.snapshot())
    }

    async fn save_all(&self, deployments: &[Deployment]) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Io(std::io::Error::other("Mock store failure")));
        }
        *self.deployments.lock().unwrap() = Some(deployments.to_vec());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.deployments.lock().unwrap().is_some())
    }
}

/// Catalog backed by a fixed set of templates.
#[derive(Default)]
pub struct StaticWorkflowCatalog {
    pub templates: HashMap<String, WorkflowTemplate>,
}

impl StaticWorkflowCatalog {
    pub fn with_workflow(mut self, template_id: &str, name: &str, run_url: &str) -> Self {
        let template = WorkflowTemplate {
            template_id: template_id.to_string(),
            workflow_id: None,
            run_url: run_url.to_string(),
            payload: serde_json::json!({ "settings": { "name": name } }),
            extra: Default::default(),
        };
        self.templates.insert(template_id.to_string(), template);
        self
    }
}

#[async_trait]
impl WorkflowCatalog for StaticWorkflowCatalog {
    async fn list_templates(&self) -> Result<Vec<WorkflowTemplate>, CatalogError> {
        let mut templates: Vec<_> = self.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(templates)
    }

    async fn find_template(&self, template_id: &str) -> Result<Option<WorkflowTemplate>, CatalogError> {
        Ok(self.templates.get(template_id).cloned())
    }
}

use crate::db::workflow_catalog::WorkflowCatalog;
use crate::engine::WorkflowExecutor;
use crate::services::deployments::DeploymentService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub deployments: Arc<DeploymentService>,
    pub catalog: Arc<dyn WorkflowCatalog>,
    pub executor: Arc<WorkflowExecutor>,
}

pub mod builtin;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::db::deployment_repository::StoreError;
use crate::db::deployment_store::DeploymentStore;
use crate::db::workflow_catalog::{CatalogError, WorkflowCatalog};
use crate::models::deployment::Deployment;
use crate::scheduler::DeploymentRunner;
use crate::services::pipedream::{InvokeError, WorkflowInvoker};
use builtin::{BuiltinRunResult, BuiltinWorkflows};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("workflow {0} not found")]
    WorkflowNotFound(String),
    #[error("built-in workflow {0} has no handler registered")]
    BuiltinUnavailable(String),
    #[error("built-in workflow {workflow_id} failed: {message}")]
    Builtin { workflow_id: String, message: String },
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowRunOutcome {
    Builtin(BuiltinRunResult),
    Remote(Value),
}

pub struct WorkflowExecutor {
    catalog: Arc<dyn WorkflowCatalog>,
    invoker: Arc<dyn WorkflowInvoker>,
    builtins: BuiltinWorkflows,
    store: Arc<DeploymentStore>,
}

impl WorkflowExecutor {
    pub fn new(
        catalog: Arc<dyn WorkflowCatalog>,
        invoker: Arc<dyn WorkflowInvoker>,
        builtins: BuiltinWorkflows,
        store: Arc<DeploymentStore>,
    ) -> Self {
        Self {
            catalog,
            invoker,
            builtins,
            store,
        }
    }

    /// Runs a workflow once for `user_id`. Reserved ids go to their built-in handler (or fail
    /// when none is registered); every other id goes to its remote endpoint.
    pub async fn run(
        &self,
        workflow_id: &str,
        user_id: &str,
        user_accounts: &[Value],
    ) -> Result<WorkflowRunOutcome, ExecutionError> {
        let definition = self
            .catalog
            .find_definition(workflow_id)
            .await?
            .ok_or_else(|| ExecutionError::WorkflowNotFound(workflow_id.to_string()))?;

        if let Some(handler) = self.builtins.get(&definition.workflow_id) {
            let result = handler
                .run(user_id, user_accounts)
                .await
                .map_err(|message| ExecutionError::Builtin {
                    workflow_id: definition.workflow_id.clone(),
                    message,
                })?;
            info!(
                workflow_id,
                processed = result.processed_count,
                notification_sent = result.notification_sent,
                success = result.success,
                "Built-in workflow finished"
            );
            return Ok(WorkflowRunOutcome::Builtin(result));
        }
        if self.builtins.is_reserved(&definition.workflow_id) {
            return Err(ExecutionError::BuiltinUnavailable(definition.workflow_id));
        }

        let response = self
            .invoker
            .invoke(user_id, &definition.invocation_endpoint)
            .await?;
        info!(workflow_id, "Remote workflow invoked");
        Ok(WorkflowRunOutcome::Remote(response))
    }

    async fn record_run(&self, deployment: &Deployment) -> Result<bool, StoreError> {
        let now = OffsetDateTime::now_utc();
        self.store
            .modify(|deployments| {
                Ok::<_, StoreError>(
                    match deployments.iter_mut().find(|d| d.id == deployment.id) {
                        Some(stored) => {
                            stored.record_run(now);
                            true
                        }
                        None => false,
                    },
                )
            })
            .await
    }
}

#[async_trait]
impl DeploymentRunner for WorkflowExecutor {
    async fn run_deployment(&self, deployment: Deployment) {
        info!(
            deployment_id = %deployment.id,
            workflow_id = %deployment.workflow_id,
            user_id = %deployment.user_id,
            "Executing scheduled workflow"
        );

        if let Err(err) = self
            .run(
                &deployment.workflow_id,
                &deployment.user_id,
                &deployment.user_accounts,
            )
            .await
        {
            error!(
                deployment_id = %deployment.id,
                workflow_id = %deployment.workflow_id,
                %err,
                "Scheduled workflow failed"
            );
            return;
        }

        match self.record_run(&deployment).await {
            Ok(true) => {}
            Ok(false) => warn!(
                deployment_id = %deployment.id,
                "Deployment no longer stored; run not recorded"
            ),
            Err(err) => error!(
                deployment_id = %deployment.id,
                %err,
                "Failed to record deployment run"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::{InMemoryDeploymentRepository, StaticWorkflowCatalog};
    use crate::engine::builtin::{BuiltinWorkflow, EMAIL_TO_SLACK};
    use crate::scheduler::SchedulerEngine;
    use crate::services::pipedream::mock::MockInvoker;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedBuiltin {
        calls: AtomicUsize,
        blow_up: bool,
    }

    #[async_trait]
    impl BuiltinWorkflow for ScriptedBuiltin {
        async fn run(&self, _user_id: &str, accounts: &[Value]) -> Result<BuiltinRunResult, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.blow_up {
                return Err("gmail token expired".into());
            }
            Ok(BuiltinRunResult {
                success: true,
                processed_count: 3,
                notification_sent: !accounts.is_empty(),
                error: None,
            })
        }
    }

    struct Fixture {
        repo: Arc<InMemoryDeploymentRepository>,
        invoker: Arc<MockInvoker>,
        executor: Arc<WorkflowExecutor>,
    }

    fn fixture(invoker: MockInvoker, builtin: Option<Arc<ScriptedBuiltin>>) -> Fixture {
        let repo = Arc::new(InMemoryDeploymentRepository::default());
        let store = Arc::new(DeploymentStore::new(repo.clone()));
        let catalog = Arc::new(
            StaticWorkflowCatalog::default()
                .with_workflow(EMAIL_TO_SLACK, "Email to Slack", "en111")
                .with_workflow("sheet-sync", "Sheet sync", "en222"),
        );
        let invoker = Arc::new(invoker);
        let mut builtins = BuiltinWorkflows::new();
        if let Some(handler) = builtin {
            builtins = builtins.with(EMAIL_TO_SLACK, handler);
        }
        let executor = Arc::new(WorkflowExecutor::new(
            catalog,
            invoker.clone(),
            builtins,
            store,
        ));
        Fixture {
            repo,
            invoker,
            executor,
        }
    }

    #[tokio::test]
    async fn remote_workflows_go_through_the_invoker() {
        let f = fixture(MockInvoker::default(), None);

        let outcome = f.executor.run("sheet-sync", "u1", &[]).await.unwrap();

        assert_eq!(outcome, WorkflowRunOutcome::Remote(json!({ "invoked": "en222" })));
        assert_eq!(f.invoker.calls(), vec![("u1".to_string(), "en222".to_string())]);
    }

    #[tokio::test]
    async fn builtin_handler_takes_precedence_over_remote_endpoint() {
        let handler = Arc::new(ScriptedBuiltin::default());
        let f = fixture(MockInvoker::default(), Some(handler.clone()));

        let outcome = f
            .executor
            .run(EMAIL_TO_SLACK, "u1", &[json!({"id": "apn_1"})])
            .await
            .unwrap();

        match outcome {
            WorkflowRunOutcome::Builtin(result) => {
                assert_eq!(result.processed_count, 3);
                assert!(result.notification_sent);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(f.invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn reserved_workflow_without_handler_never_runs_remotely() {
        let f = fixture(MockInvoker::default(), None);
        let deployment = Deployment::new("u1", EMAIL_TO_SLACK, "Email to Slack", 5, vec![]);
        f.repo.seed(vec![deployment.clone()]);

        assert!(matches!(
            f.executor.run(EMAIL_TO_SLACK, "u1", &[]).await,
            Err(ExecutionError::BuiltinUnavailable(id)) if id == EMAIL_TO_SLACK
        ));
        f.executor.run_deployment(deployment).await;

        assert!(f.invoker.calls().is_empty());
        assert_eq!(f.repo.snapshot()[0].run_count, 0);
    }

    #[tokio::test]
    async fn unknown_workflow_is_reported() {
        let f = fixture(MockInvoker::default(), None);
        assert!(matches!(
            f.executor.run("nope", "u1", &[]).await,
            Err(ExecutionError::WorkflowNotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn successful_run_is_recorded() {
        let f = fixture(MockInvoker::default(), None);
        let deployment = Deployment::new("u1", "sheet-sync", "Sheet sync", 5, vec![]);
        f.repo.seed(vec![deployment.clone()]);

        f.executor.run_deployment(deployment).await;

        let stored = &f.repo.snapshot()[0];
        assert_eq!(stored.run_count, 1);
        assert!(stored.last_run.is_some());
    }

    #[tokio::test]
    async fn failed_run_leaves_counters_alone() {
        let f = fixture(MockInvoker::failing(502), None);
        let deployment = Deployment::new("u1", "sheet-sync", "Sheet sync", 5, vec![]);
        f.repo.seed(vec![deployment.clone()]);

        f.executor.run_deployment(deployment).await;

        let stored = &f.repo.snapshot()[0];
        assert_eq!(stored.run_count, 0);
        assert!(stored.last_run.is_none());
        assert_eq!(f.repo.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_builtin_keeps_firing_on_schedule() {
        let handler = Arc::new(ScriptedBuiltin {
            blow_up: true,
            ..Default::default()
        });
        let f = fixture(MockInvoker::default(), Some(handler.clone()));
        let deployment = Deployment::new("u1", EMAIL_TO_SLACK, "Email to Slack", 1, vec![]);
        f.repo.seed(vec![deployment.clone()]);
        let engine = SchedulerEngine::new(f.executor.clone());

        assert!(engine.schedule(&deployment));
        for _ in 0..20 {
            if handler.calls.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }

        assert!(handler.calls.load(Ordering::SeqCst) >= 2);
        assert!(engine.is_scheduled(&deployment.id));
        assert_eq!(f.repo.snapshot()[0].run_count, 0);
        engine.shutdown();
    }
}

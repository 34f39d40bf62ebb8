use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::deployment_repository::StoreError;
use crate::db::deployment_store::DeploymentStore;
use crate::db::workflow_catalog::{CatalogError, WorkflowCatalog};
use crate::models::deployment::{DeployRequest, Deployment, DeploymentStatus, UpdateDeployment};
use crate::scheduler::registry::JobSummary;
use crate::scheduler::trigger::MAX_INTERVAL_MINUTES;
use crate::scheduler::SchedulerEngine;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("{0}")]
    Validation(String),
    #[error("No workflow found with ID {0}")]
    WorkflowNotFound(String),
    #[error("No deployment found with ID {0}")]
    NotFound(String),
    #[error("This workflow is already deployed and active for this user")]
    Conflict { existing: Box<Deployment> },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

enum TimerChange {
    Keep,
    Schedule,
    Cancel,
}

fn checked_interval(raw: i64) -> Result<u32, DeploymentError> {
    u32::try_from(raw)
        .ok()
        .filter(|minutes| (1..=MAX_INTERVAL_MINUTES).contains(minutes))
        .ok_or_else(|| {
            DeploymentError::Validation(format!(
                "pollingInterval must be between 1 and {} minutes",
                MAX_INTERVAL_MINUTES
            ))
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Creates, updates, removes and recovers deployments, keeping the scheduler's timers in
/// line with each deployment's persisted status.
pub struct DeploymentService {
    store: Arc<DeploymentStore>,
    catalog: Arc<dyn WorkflowCatalog>,
    scheduler: Arc<SchedulerEngine>,
}

impl DeploymentService {
    pub fn new(
        store: Arc<DeploymentStore>,
        catalog: Arc<dyn WorkflowCatalog>,
        scheduler: Arc<SchedulerEngine>,
    ) -> Self {
        Self {
            store,
            catalog,
            scheduler,
        }
    }

    pub async fn deploy(&self, request: DeployRequest) -> Result<Deployment, DeploymentError> {
        let (Some(user_id), Some(workflow_id), Some(raw_interval)) = (
            non_blank(request.user_id),
            non_blank(request.workflow_id),
            request.polling_interval.filter(|n| *n != 0),
        ) else {
            return Err(DeploymentError::Validation(
                "userId, workflowId, and pollingInterval are required".into(),
            ));
        };
        let interval = checked_interval(raw_interval)?;

        let definition = self
            .catalog
            .find_definition(&workflow_id)
            .await?
            .ok_or_else(|| DeploymentError::WorkflowNotFound(workflow_id.clone()))?;

        let deployment = self
            .store
            .modify_with(
                |deployments| {
                    if let Some(existing) = deployments.iter().find(|d| {
                        d.user_id == user_id && d.workflow_id == workflow_id && d.is_active()
                    }) {
                        return Err(DeploymentError::Conflict {
                            existing: Box::new(existing.clone()),
                        });
                    }
                    let deployment = Deployment::new(
                        user_id.as_str(),
                        workflow_id.as_str(),
                        definition.name.as_str(),
                        interval,
                        request.user_accounts.unwrap_or_default(),
                    );
                    deployments.push(deployment.clone());
                    Ok(deployment)
                },
                |deployment: &Deployment| {
                    self.scheduler.schedule(deployment);
                },
            )
            .await?;

        info!(
            deployment_id = %deployment.id,
            user_id = %deployment.user_id,
            workflow_id = %deployment.workflow_id,
            polling_interval = deployment.polling_interval_minutes,
            "Workflow deployed"
        );
        Ok(deployment)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Deployment>, DeploymentError> {
        Ok(self
            .store
            .read()
            .await?
            .into_iter()
            .filter(|d| d.user_id == user_id)
            .collect())
    }

    pub async fn update(
        &self,
        deployment_id: &str,
        changes: UpdateDeployment,
    ) -> Result<Deployment, DeploymentError> {
        let id = Uuid::parse_str(deployment_id)
            .map_err(|_| DeploymentError::NotFound(deployment_id.to_string()))?;

        let raw_interval = changes.polling_interval;
        let requested_status = changes.status.as_deref().and_then(|raw| {
            let parsed = raw.parse::<DeploymentStatus>().ok();
            if parsed.is_none() {
                warn!(deployment_id = %id, status = raw, "Ignoring unknown deployment status");
            }
            parsed
        });

        let (deployment, _) = self
            .store
            .modify_with(
                |deployments| {
                    let deployment = deployments
                        .iter_mut()
                        .find(|d| d.id == id)
                        .ok_or_else(|| DeploymentError::NotFound(deployment_id.to_string()))?;
                    let requested_interval = match raw_interval {
                        Some(raw) if raw > 0 => Some(checked_interval(raw)?),
                        _ => None,
                    };
                    let now = OffsetDateTime::now_utc();
                    let mut change = TimerChange::Keep;

                    if let Some(minutes) = requested_interval {
                        deployment.polling_interval_minutes = minutes;
                        deployment.updated_at = Some(now);
                        if deployment.is_active() {
                            change = TimerChange::Schedule;
                        }
                    }

                    if let Some(status) = requested_status {
                        if status != deployment.status {
                            deployment.status = status;
                            deployment.updated_at = Some(now);
                            change = match status {
                                DeploymentStatus::Active => TimerChange::Schedule,
                                DeploymentStatus::Inactive => {
                                    deployment.stopped_at = Some(now);
                                    TimerChange::Cancel
                                }
                            };
                        }
                    }

                    Ok::<_, DeploymentError>((deployment.clone(), change))
                },
                |(deployment, change): &(Deployment, TimerChange)| match change {
                    TimerChange::Schedule => {
                        self.scheduler.schedule(deployment);
                    }
                    TimerChange::Cancel => {
                        self.scheduler.cancel(&deployment.id);
                    }
                    TimerChange::Keep => {}
                },
            )
            .await?;

        info!(deployment_id = %deployment.id, status = %deployment.status, "Deployment updated");
        Ok(deployment)
    }

    pub async fn delete(&self, deployment_id: &str) -> Result<Deployment, DeploymentError> {
        let id = Uuid::parse_str(deployment_id)
            .map_err(|_| DeploymentError::NotFound(deployment_id.to_string()))?;

        let removed = self
            .store
            .modify_with(
                |deployments| {
                    let index = deployments
                        .iter()
                        .position(|d| d.id == id)
                        .ok_or_else(|| DeploymentError::NotFound(deployment_id.to_string()))?;
                    Ok::<_, DeploymentError>(deployments.remove(index))
                },
                |removed: &Deployment| {
                    // Inactive deployments have no timer, but a stray one from a failed
                    // schedule must not outlive the record either.
                    self.scheduler.cancel(&removed.id);
                },
            )
            .await?;

        info!(deployment_id = %removed.id, "Deployment deleted");
        Ok(removed)
    }

    /// Reschedules every persisted active deployment. Must finish before requests are served.
    pub async fn recover(&self) -> Result<usize, DeploymentError> {
        if !self.store.exists().await? {
            info!("No deployment state found; initialising an empty collection");
            self.store.initialize_empty().await?;
            return Ok(0);
        }

        let active: Vec<Deployment> = self
            .store
            .read()
            .await?
            .into_iter()
            .filter(Deployment::is_active)
            .collect();
        info!(count = active.len(), "Found active deployments");

        let recovered = active
            .iter()
            .filter(|deployment| self.scheduler.schedule(deployment))
            .count();
        info!(
            recovered,
            jobs = self.scheduler.job_count(),
            "Recovered deployment schedules"
        );
        Ok(recovered)
    }

    pub fn active_jobs(&self) -> Vec<JobSummary> {
        self.scheduler.list_jobs()
    }
}

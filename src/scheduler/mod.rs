pub mod registry;
pub mod trigger;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::deployment::Deployment;
use registry::{JobSummary, ScheduleRegistry};
use trigger::TriggerSpec;

/// Receives every timer firing. Implementations own their error handling; nothing is
/// reported back to the timer.
#[async_trait]
pub trait DeploymentRunner: Send + Sync {
    async fn run_deployment(&self, deployment: Deployment);
}

/// Owns the recurring timers for active deployments.
///
/// Each scheduled deployment gets one timer task. A firing hands the deployment captured at
/// schedule time to the runner on its own task, so a slow or failing run never delays the
/// timer and cancelling the timer never interrupts a run that already started.
pub struct SchedulerEngine {
    registry: ScheduleRegistry,
    runner: Arc<dyn DeploymentRunner>,
}

impl SchedulerEngine {
    pub fn new(runner: Arc<dyn DeploymentRunner>) -> Self {
        Self {
            registry: ScheduleRegistry::new(),
            runner,
        }
    }

    /// Starts (or restarts) the timer for `deployment`. Returns `false` when the polling
    /// interval has no valid trigger, in which case nothing is registered.
    pub fn schedule(&self, deployment: &Deployment) -> bool {
        if self.registry.unregister(&deployment.id) {
            debug!(deployment_id = %deployment.id, "Replacing existing timer");
        }

        let trigger = match TriggerSpec::every_minutes(deployment.polling_interval_minutes) {
            Ok(trigger) => trigger,
            Err(err) => {
                error!(
                    deployment_id = %deployment.id,
                    polling_interval = deployment.polling_interval_minutes,
                    %err,
                    "Failed to schedule deployment"
                );
                return false;
            }
        };

        let handle = tokio::spawn(run_timer(
            deployment.clone(),
            trigger.clone(),
            self.runner.clone(),
        ));

        info!(
            deployment_id = %deployment.id,
            workflow_id = %deployment.workflow_id,
            cron = trigger.expression(),
            "Deployment scheduled"
        );
        self.registry
            .register(deployment.id, handle, deployment.clone(), trigger);
        true
    }

    pub fn cancel(&self, deployment_id: &Uuid) -> bool {
        let cancelled = self.registry.unregister(deployment_id);
        if cancelled {
            info!(deployment_id = %deployment_id, "Deployment timer cancelled");
        }
        cancelled
    }

    #[cfg(test)]
    pub fn is_scheduled(&self, deployment_id: &Uuid) -> bool {
        self.registry.contains(deployment_id)
    }

    #[cfg(test)]
    pub fn job(&self, deployment_id: &Uuid) -> Option<JobSummary> {
        self.registry.get(deployment_id)
    }

    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.registry.list()
    }

    pub fn job_count(&self) -> usize {
        self.registry.len()
    }

    pub fn shutdown(&self) {
        if self.registry.is_empty() {
            debug!("Scheduler stopped with no active timers");
            return;
        }
        let stopped = self.registry.clear();
        info!(stopped, "Scheduler stopped");
    }
}

async fn run_timer(deployment: Deployment, trigger: TriggerSpec, runner: Arc<dyn DeploymentRunner>) {
    let mut last_fire = Utc::now();
    loop {
        let Some(next) = trigger.next_due(last_fire, Utc::now()) else {
            warn!(deployment_id = %deployment.id, "Trigger has no further fire times");
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        last_fire = next;

        debug!(deployment_id = %deployment.id, fire_at = %next, "Timer fired");
        let runner = runner.clone();
        let snapshot = deployment.clone();
        tokio::spawn(async move {
            runner.run_deployment(snapshot).await;
        });
    }
}

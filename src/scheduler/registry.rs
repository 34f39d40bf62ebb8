use dashmap::DashMap;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::deployment::Deployment;
use crate::scheduler::trigger::TriggerSpec;

pub struct ScheduledJob {
    pub handle: JoinHandle<()>,
    pub deployment: Deployment,
    pub trigger: TriggerSpec,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub deployment_id: Uuid,
    pub workflow_id: String,
    pub workflow_name: String,
    pub user_id: String,
    pub cron_expression: String,
    pub polling_interval: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_run: Option<OffsetDateTime>,
    pub run_count: u64,
}

impl From<&ScheduledJob> for JobSummary {
    fn from(job: &ScheduledJob) -> Self {
        Self {
            deployment_id: job.deployment.id,
            workflow_id: job.deployment.workflow_id.clone(),
            workflow_name: job.deployment.workflow_name.clone(),
            user_id: job.deployment.user_id.clone(),
            cron_expression: job.trigger.expression().to_string(),
            polling_interval: job.deployment.polling_interval_minutes,
            created_at: job.created_at,
            last_run: job.deployment.last_run,
            run_count: job.deployment.run_count,
        }
    }
}

/// Live timers keyed by deployment id. In-memory only and rebuilt on every start.
#[derive(Default)]
pub struct ScheduleRegistry {
    jobs: DashMap<Uuid, ScheduledJob>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the timer for `id`, stopping any timer it replaces.
    pub fn register(
        &self,
        id: Uuid,
        handle: JoinHandle<()>,
        deployment: Deployment,
        trigger: TriggerSpec,
    ) {
        let job = ScheduledJob {
            handle,
            deployment,
            trigger,
            created_at: OffsetDateTime::now_utc(),
        };
        if let Some(previous) = self.jobs.insert(id, job) {
            previous.handle.abort();
        }
    }

    pub fn unregister(&self, id: &Uuid) -> bool {
        match self.jobs.remove(id) {
            Some((_, job)) => {
                job.handle.abort();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.jobs.contains_key(id)
    }

    #[cfg(test)]
    pub fn get(&self, id: &Uuid) -> Option<JobSummary> {
        self.jobs.get(id).map(|job| JobSummary::from(job.value()))
    }

    pub fn list(&self) -> Vec<JobSummary> {
        let mut jobs: Vec<JobSummary> = self
            .jobs
            .iter()
            .map(|entry| JobSummary::from(entry.value()))
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Stops every timer and empties the registry, returning how many were stopped.
    pub fn clear(&self) -> usize {
        let ids: Vec<Uuid> = self.jobs.iter().map(|entry| *entry.key()).collect();
        ids.iter().filter(|id| self.unregister(id)).count()
    }
}

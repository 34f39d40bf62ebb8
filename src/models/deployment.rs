use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Active,
    Inactive,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Active => "active",
            DeploymentStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(DeploymentStatus::Active),
            "inactive" => Ok(DeploymentStatus::Inactive),
            _ => Err(()),
        }
    }
}

/// A workflow bound to a user, an account snapshot and a recurring schedule.
///
/// Field names follow the camelCase layout of `deployments.json` so files written by
/// earlier versions of the service load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: Uuid,
    pub user_id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    #[serde(rename = "pollingInterval")]
    pub polling_interval_minutes: u32,
    #[serde(default)]
    pub user_accounts: Vec<Value>,
    pub status: DeploymentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub stopped_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_run: Option<OffsetDateTime>,
    #[serde(default)]
    pub run_count: u64,
}

impl Deployment {
    /// New deployments always start active and never-run.
    pub fn new(
        user_id: impl Into<String>,
        workflow_id: impl Into<String>,
        workflow_name: impl Into<String>,
        polling_interval_minutes: u32,
        user_accounts: Vec<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            workflow_id: workflow_id.into(),
            workflow_name: workflow_name.into(),
            polling_interval_minutes,
            user_accounts,
            status: DeploymentStatus::Active,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            stopped_at: None,
            last_run: None,
            run_count: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DeploymentStatus::Active
    }

    pub fn record_run(&mut self, at: OffsetDateTime) {
        self.last_run = Some(at);
        self.run_count += 1;
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub polling_interval: Option<i64>,
    #[serde(default)]
    pub user_accounts: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeployment {
    #[serde(default)]
    pub polling_interval: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_deployment_starts_active_and_unrun() {
        let deployment = Deployment::new("user-1", "wf-1", "Digest", 5, vec![]);
        assert_eq!(deployment.status, DeploymentStatus::Active);
        assert_eq!(deployment.run_count, 0);
        assert!(deployment.last_run.is_none());
        assert!(deployment.updated_at.is_none());
        assert!(deployment.stopped_at.is_none());
    }

    #[test]
    fn serializes_with_legacy_field_names() {
        let deployment = Deployment::new("user-1", "wf-1", "Digest", 5, vec![json!({"id": "apn_1"})]);
        let value = serde_json::to_value(&deployment).unwrap();

        assert_eq!(value["pollingInterval"], 5);
        assert_eq!(value["status"], "active");
        assert_eq!(value["lastRun"], Value::Null);
        assert_eq!(value["runCount"], 0);
        assert!(value.get("updatedAt").is_none());
        assert!(value.get("stoppedAt").is_none());
        assert_eq!(value["userAccounts"][0]["id"], "apn_1");
    }

    #[test]
    fn reads_records_from_existing_state_files() {
        let raw = json!({
            "id": "0b5f6c1e-8a4e-4a57-9d4b-1d2a3b4c5d6e",
            "userId": "someone@example.com",
            "workflowId": "email-to-slack",
            "workflowName": "Email to Slack",
            "pollingInterval": 10,
            "userAccounts": [{"id": "apn_gmail", "app": {"name": "Gmail"}}],
            "status": "inactive",
            "createdAt": "2025-01-02T03:04:05.678Z",
            "updatedAt": "2025-01-03T00:00:00.000Z",
            "stoppedAt": "2025-01-03T00:00:00.000Z",
            "lastRun": null,
            "runCount": 3
        });

        let deployment: Deployment = serde_json::from_value(raw).unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Inactive);
        assert_eq!(deployment.polling_interval_minutes, 10);
        assert_eq!(deployment.run_count, 3);
        assert!(deployment.stopped_at.is_some());
        assert!(deployment.last_run.is_none());
    }

    #[test]
    fn status_parses_only_known_values() {
        assert_eq!("active".parse::<DeploymentStatus>(), Ok(DeploymentStatus::Active));
        assert_eq!(
            "inactive".parse::<DeploymentStatus>(),
            Ok(DeploymentStatus::Inactive)
        );
        assert!("paused".parse::<DeploymentStatus>().is_err());
    }
}

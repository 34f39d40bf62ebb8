use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Reserved id of the mail-attachment-to-chat forwarder.
pub const EMAIL_TO_SLACK: &str = "email-to-slack";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinRunResult {
    pub success: bool,
    pub processed_count: u64,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A workflow implemented in-process rather than on the automation platform.
///
/// `Err` means the handler blew up; a handled failure is `Ok` with `success: false`.
#[async_trait]
pub trait BuiltinWorkflow: Send + Sync {
    async fn run(&self, user_id: &str, user_accounts: &[Value])
        -> Result<BuiltinRunResult, String>;
}

/// Handler table keyed by reserved workflow id. Built once at startup.
///
/// Reserved ids never fall through to a remote endpoint; a reserved id with no registered
/// handler cannot run at all.
#[derive(Clone)]
pub struct BuiltinWorkflows {
    reserved: HashSet<String>,
    handlers: HashMap<String, Arc<dyn BuiltinWorkflow>>,
}

impl Default for BuiltinWorkflows {
    fn default() -> Self {
        Self {
            reserved: HashSet::from([EMAIL_TO_SLACK.to_string()]),
            handlers: HashMap::new(),
        }
    }
}

impl BuiltinWorkflows {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, workflow_id: impl Into<String>, handler: Arc<dyn BuiltinWorkflow>) -> Self {
        let workflow_id = workflow_id.into();
        self.reserved.insert(workflow_id.clone());
        self.handlers.insert(workflow_id, handler);
        self
    }

    pub fn is_reserved(&self, workflow_id: &str) -> bool {
        self.reserved.contains(workflow_id)
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<dyn BuiltinWorkflow>> {
        self.handlers.get(workflow_id).cloned()
    }

    /// Reserved ids that have no handler registered.
    pub fn unavailable(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .reserved
            .iter()
            .filter(|id| !self.handlers.contains_key(*id))
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids
    }
}

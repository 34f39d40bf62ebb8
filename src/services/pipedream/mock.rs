use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use super::{InvokeError, WorkflowInvoker};

#[derive(Default)]
pub struct MockInvoker {
    pub calls: Mutex<Vec<(String, String)>>,
    pub fail_with_status: Option<u16>,
}

impl MockInvoker {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowInvoker for MockInvoker {
    async fn invoke(&self, external_user_id: &str, endpoint: &str) -> Result<Value, InvokeError> {
        self.calls
            .lock()
            .unwrap()
            .push((external_user_id.to_string(), endpoint.to_string()));
        if let Some(status) = self.fail_with_status {
            return Err(InvokeError::Status {
                status,
                body: "mock failure".into(),
            });
        }
        Ok(json!({ "invoked": endpoint }))
    }
}

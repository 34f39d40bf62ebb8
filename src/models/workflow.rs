use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A workflow template as stored in the catalog file.
///
/// Only the fields the deployment subsystem needs are typed; everything else is carried in
/// `extra` so the browse endpoints can return the template untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub run_url: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowTemplate {
    pub fn name(&self) -> String {
        self.payload
            .get("settings")
            .and_then(|settings| settings.get("name"))
            .and_then(|name| name.as_str())
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.template_id)
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    pub invocation_endpoint: String,
}

impl From<&WorkflowTemplate> for WorkflowDefinition {
    fn from(template: &WorkflowTemplate) -> Self {
        Self {
            workflow_id: template.template_id.clone(),
            name: template.name(),
            invocation_endpoint: template.run_url.clone(),
        }
    }
}

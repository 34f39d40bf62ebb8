pub mod live;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;

pub use live::PipedreamClient;

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("pipedream is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("invalid workflow endpoint: {0:?}")]
    InvalidEndpoint(String),
    #[error("failed to obtain pipedream access token: {0}")]
    Token(String),
    #[error("workflow invocation failed: {0}")]
    Transport(String),
    #[error("workflow endpoint responded with {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for InvokeError {
    fn from(err: reqwest::Error) -> Self {
        InvokeError::Transport(err.to_string())
    }
}

/// Runs a remotely hosted workflow on behalf of one of our users.
#[async_trait]
pub trait WorkflowInvoker: Send + Sync {
    async fn invoke(&self, external_user_id: &str, endpoint: &str) -> Result<Value, InvokeError>;
}

#[derive(Debug, Clone, Default)]
pub struct PipedreamSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub project_id: Option<String>,
    pub environment: String,
    pub api_base: String,
}

/// Accepts either a full URL or a bare endpoint id (`en...`).
pub fn resolve_endpoint(endpoint: &str) -> Result<String, InvokeError> {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        Ok(endpoint.to_string())
    } else if endpoint.starts_with("en") && endpoint.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(format!("https://{}.m.pipedream.net", endpoint))
    } else {
        Err(InvokeError::InvalidEndpoint(endpoint.to_string()))
    }
}

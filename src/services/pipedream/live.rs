use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{resolve_endpoint, InvokeError, PipedreamSettings, WorkflowInvoker};

// Refresh a little before the platform's stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct PipedreamClient {
    pub client: Client,
    settings: PipedreamSettings,
    token: Mutex<Option<CachedToken>>,
}

impl PipedreamClient {
    pub fn new(client: Client, settings: PipedreamSettings) -> Self {
        Self {
            client,
            settings,
            token: Mutex::new(None),
        }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), InvokeError> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .ok_or(InvokeError::NotConfigured("PIPEDREAM_CLIENT_ID"))?;
        let client_secret = self
            .settings
            .client_secret
            .as_deref()
            .ok_or(InvokeError::NotConfigured("PIPEDREAM_CLIENT_SECRET"))?;
        let project_id = self
            .settings
            .project_id
            .as_deref()
            .ok_or(InvokeError::NotConfigured("PIPEDREAM_PROJECT_ID"))?;
        Ok((client_id, client_secret, project_id))
    }

    async fn access_token(&self) -> Result<String, InvokeError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let (client_id, client_secret, _) = self.credentials()?;
        let url = format!("{}/v1/oauth/token", self.settings.api_base.trim_end_matches('/'));
        let res = self
            .client
            .post(url)
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": client_id,
                "client_secret": client_secret,
            }))
            .send()
            .await
            .map_err(|e| InvokeError::Token(e.to_string()))?;

        if !res.status().is_success() {
            return Err(InvokeError::Token(format!("status {}", res.status())));
        }

        let token: TokenResponse = res
            .json()
            .await
            .map_err(|e| InvokeError::Token(e.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600))
            .saturating_sub(TOKEN_EXPIRY_MARGIN);

        debug!(expires_in_secs = lifetime.as_secs(), "Fetched pipedream access token");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl WorkflowInvoker for PipedreamClient {
    async fn invoke(&self, external_user_id: &str, endpoint: &str) -> Result<Value, InvokeError> {
        let (_, _, project_id) = self.credentials()?;
        let url = resolve_endpoint(endpoint)?;
        let token = self.access_token().await?;

        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("X-PD-External-User-ID", external_user_id)
            .header("X-PD-Environment", &self.settings.environment)
            .header("X-PD-Project-ID", project_id)
            .json(&json!({}))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(server: &MockServer) -> PipedreamSettings {
        PipedreamSettings {
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            project_id: Some("proj_1".into()),
            environment: "development".into(),
            api_base: server.base_url(),
        }
    }

    #[tokio::test]
    async fn invokes_workflow_with_user_headers_and_reuses_token() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/oauth/token");
                then.status(200)
                    .json_body(json!({ "access_token": "tok_1", "expires_in": 3600 }));
            })
            .await;
        let run_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hooks/run")
                    .header("authorization", "Bearer tok_1")
                    .header("x-pd-external-user-id", "user@example.com")
                    .header("x-pd-environment", "development");
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;

        let client = PipedreamClient::new(Client::new(), settings(&server));
        let endpoint = server.url("/hooks/run");

        let first = client.invoke("user@example.com", &endpoint).await.unwrap();
        let second = client.invoke("user@example.com", &endpoint).await.unwrap();

        assert_eq!(first, json!({ "ok": true }));
        assert_eq!(second, json!({ "ok": true }));
        token_mock.assert_hits_async(1).await;
        run_mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/oauth/token");
                then.status(200).json_body(json!({ "access_token": "tok_1" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hooks/run");
                then.status(500).body("boom");
            })
            .await;

        let client = PipedreamClient::new(Client::new(), settings(&server));
        let err = client
            .invoke("user@example.com", &server.url("/hooks/run"))
            .await
            .unwrap_err();

        match err {
            InvokeError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let client = PipedreamClient::new(
            Client::new(),
            PipedreamSettings {
                environment: "development".into(),
                api_base: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
        );

        let err = client.invoke("u1", "en123").await.unwrap_err();
        assert!(matches!(err, InvokeError::NotConfigured("PIPEDREAM_CLIENT_ID")));
    }
}

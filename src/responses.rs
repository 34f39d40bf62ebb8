use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::models::deployment::Deployment;

/// Error envelope shared by every route. `error` is a short title, `message` is display text.
#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
}

impl JsonResponse {
    fn error(status: StatusCode, error: &str, msg: &str) -> (StatusCode, Json<JsonResponse>) {
        (
            status,
            Json(JsonResponse {
                success: false,
                error: Some(error.to_string()),
                message: msg.to_string(),
                deployment: None,
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                success: true,
                error: None,
                message: msg.to_string(),
                deployment: None,
            }),
        )
    }

    pub fn bad_request(error: &str, msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::BAD_REQUEST, error, msg)
    }

    pub fn not_found(error: &str, msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::NOT_FOUND, error, msg)
    }

    pub fn server_error(error: &str, msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, error, msg)
    }

    pub fn bad_gateway(error: &str, msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::BAD_GATEWAY, error, msg)
    }

    /// Duplicate deployments are a 400 carrying the record that blocked the request.
    pub fn already_deployed(msg: &str, existing: Deployment) -> impl IntoResponse {
        (
            StatusCode::BAD_REQUEST,
            Json(JsonResponse {
                success: false,
                error: Some("Workflow already deployed".to_string()),
                message: msg.to_string(),
                deployment: Some(existing),
            }),
        )
    }
}

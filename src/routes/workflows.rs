use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{
    engine::{ExecutionError, WorkflowRunOutcome},
    responses::JsonResponse,
    routes::invalid_body,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWorkflowRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_accounts: Option<Vec<Value>>,
}

pub async fn list_workflows(State(state): State<AppState>) -> Response {
    match state.catalog.list_templates().await {
        Ok(workflows) => {
            (StatusCode::OK, Json(json!({ "workflows": workflows }))).into_response()
        }
        Err(e) => {
            error!(?e, "Failed to read workflow catalog");
            JsonResponse::server_error("Failed to fetch workflows", &e.to_string()).into_response()
        }
    }
}

pub async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.catalog.find_template(&id).await {
        Ok(Some(workflow)) => {
            (StatusCode::OK, Json(json!({ "workflow": workflow }))).into_response()
        }
        Ok(None) => JsonResponse::not_found(
            "Workflow not found",
            &format!("No workflow found with ID {}", id),
        )
        .into_response(),
        Err(e) => {
            error!(?e, workflow_id = %id, "Failed to read workflow catalog");
            JsonResponse::server_error("Failed to fetch workflow", &e.to_string()).into_response()
        }
    }
}

/// Runs a workflow once for a user without creating a deployment.
pub async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RunWorkflowRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    let Some(user_id) = payload.user_id.filter(|u| !u.trim().is_empty()) else {
        return JsonResponse::bad_request("Invalid request", "userId is required").into_response();
    };
    let accounts = payload.user_accounts.unwrap_or_default();

    info!(workflow_id = %id, %user_id, "Running workflow on demand");
    match state.executor.run(&id, &user_id, &accounts).await {
        Ok(WorkflowRunOutcome::Builtin(result)) if result.success => {
            let message = if result.processed_count > 0 {
                format!("Successfully processed {} items", result.processed_count)
            } else {
                "Nothing new to process".to_string()
            };
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": message,
                    "processedCount": result.processed_count,
                    "notificationSent": result.notification_sent,
                })),
            )
                .into_response()
        }
        Ok(WorkflowRunOutcome::Builtin(result)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": result.error.unwrap_or_else(|| "Workflow failed".to_string()),
                "processedCount": 0,
            })),
        )
            .into_response(),
        Ok(WorkflowRunOutcome::Remote(response)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "response": response })),
        )
            .into_response(),
        Err(ExecutionError::WorkflowNotFound(_)) => JsonResponse::not_found(
            "Workflow not found",
            &format!("No workflow found with ID {}", id),
        )
        .into_response(),
        Err(e @ ExecutionError::Invoke(_)) => {
            error!(workflow_id = %id, error = %e, "Remote workflow invocation failed");
            JsonResponse::bad_gateway("Failed to run workflow", &e.to_string()).into_response()
        }
        Err(e) => {
            error!(workflow_id = %id, error = %e, "Workflow run failed");
            JsonResponse::server_error("Failed to run workflow", &e.to_string()).into_response()
        }
    }
}

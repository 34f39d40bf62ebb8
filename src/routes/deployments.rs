use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::{
    models::deployment::{DeployRequest, UpdateDeployment},
    responses::JsonResponse,
    routes::invalid_body,
    services::deployments::DeploymentError,
    state::AppState,
};

/// Maps lifecycle errors onto the JSON error envelope; `failure` titles 500 responses.
fn error_response(err: DeploymentError, failure: &str) -> Response {
    let message = err.to_string();
    match err {
        DeploymentError::Validation(_) => {
            JsonResponse::bad_request("Invalid request", &message).into_response()
        }
        DeploymentError::Conflict { existing } => {
            JsonResponse::already_deployed(&message, *existing).into_response()
        }
        DeploymentError::WorkflowNotFound(_) => {
            JsonResponse::not_found("Workflow not found", &message).into_response()
        }
        DeploymentError::NotFound(_) => {
            JsonResponse::not_found("Deployment not found", &message).into_response()
        }
        DeploymentError::Store(_) | DeploymentError::Catalog(_) => {
            error!(%message, "{}", failure);
            JsonResponse::server_error(failure, &message).into_response()
        }
    }
}

pub async fn deploy_workflow(
    State(state): State<AppState>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    match state.deployments.deploy(payload).await {
        Ok(deployment) => {
            let minutes = deployment.polling_interval_minutes;
            let message = format!(
                "Workflow deployed successfully. It will run every {} minute{}.",
                minutes,
                if minutes != 1 { "s" } else { "" }
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": message,
                    "deployment": deployment,
                })),
            )
                .into_response()
        }
        Err(err) => error_response(err, "Failed to deploy workflow"),
    }
}

pub async fn list_deployments(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.deployments.list(&user_id).await {
        Ok(deployments) => (
            StatusCode::OK,
            Json(json!({ "success": true, "deployments": deployments })),
        )
            .into_response(),
        Err(err) => error_response(err, "Failed to list deployments"),
    }
}

pub async fn update_deployment(
    State(state): State<AppState>,
    Path(deployment_id): Path<String>,
    payload: Result<Json<UpdateDeployment>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    match state.deployments.update(&deployment_id, payload).await {
        Ok(deployment) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Deployment updated successfully",
                "deployment": deployment,
            })),
        )
            .into_response(),
        Err(err) => error_response(err, "Failed to update deployment"),
    }
}

pub async fn delete_deployment(
    State(state): State<AppState>,
    Path(deployment_id): Path<String>,
) -> Response {
    match state.deployments.delete(&deployment_id).await {
        Ok(deployment) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Deployment deleted successfully",
                "deployment": deployment,
            })),
        )
            .into_response(),
        Err(err) => error_response(err, "Failed to delete deployment"),
    }
}

pub async fn active_jobs(State(state): State<AppState>) -> Response {
    let jobs = state.deployments.active_jobs();
    (
        StatusCode::OK,
        Json(json!({ "success": true, "count": jobs.len(), "jobs": jobs })),
    )
        .into_response()
}

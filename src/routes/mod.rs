pub mod deployments;
pub mod workflows;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};

use crate::{responses::JsonResponse, state::AppState};

async fn root() -> impl IntoResponse {
    JsonResponse::success("Workflow deployment service is running")
}

/// Unreadable or mistyped JSON bodies get the same envelope as validation failures.
pub(crate) fn invalid_body(rejection: JsonRejection) -> Response {
    JsonResponse::bad_request("Invalid request", &rejection.body_text()).into_response()
}

pub fn deployment_routes() -> Router<AppState> {
    Router::new()
        .route("/deploy", post(deployments::deploy_workflow))
        .route("/list/{user_id}", get(deployments::list_deployments))
        .route("/update/{deployment_id}", put(deployments::update_deployment))
        .route("/delete/{deployment_id}", delete(deployments::delete_deployment))
        .route("/active", get(deployments::active_jobs))
}

pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(workflows::list_workflows))
        .route("/{id}", get(workflows::get_workflow))
        .route("/run/{id}", post(workflows::run_workflow))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/deployments", deployment_routes())
        .nest("/workflows", workflow_routes())
        .with_state(state)
}

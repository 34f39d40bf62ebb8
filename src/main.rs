mod config;
mod db;
mod engine;
mod models;
mod responses;
mod routes;
mod scheduler;
mod services;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use config::Config;
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::db::deployment_repository::DeploymentRepository;
use crate::db::deployment_store::DeploymentStore;
use crate::db::json_deployment_repository::JsonDeploymentRepository;
use crate::db::workflow_catalog::{JsonWorkflowCatalog, WorkflowCatalog};
use crate::engine::builtin::BuiltinWorkflows;
use crate::engine::WorkflowExecutor;
use crate::scheduler::SchedulerEngine;
use crate::services::deployments::DeploymentService;
use crate::services::pipedream::{PipedreamClient, WorkflowInvoker};
use crate::state::AppState;

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let Some(origin) = config.frontend_origin.as_deref() else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("FRONTEND_ORIGIN is not a valid origin: {}", origin))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let config = Config::from_env();

    if config.pipedream.client_id.is_none() || config.pipedream.client_secret.is_none() {
        warn!("Pipedream credentials are not set; remote workflow runs will fail");
    }

    let deployment_repo = Arc::new(JsonDeploymentRepository::new(config.deployments_path()))
        as Arc<dyn DeploymentRepository>;
    let store = Arc::new(DeploymentStore::new(deployment_repo));

    let catalog = Arc::new(JsonWorkflowCatalog::new(config.workflows_path()))
        as Arc<dyn WorkflowCatalog>;
    let invoker = Arc::new(PipedreamClient::new(Client::new(), config.pipedream.clone()))
        as Arc<dyn WorkflowInvoker>;

    let builtins = BuiltinWorkflows::new();
    let unavailable = builtins.unavailable();
    if !unavailable.is_empty() {
        warn!(
            workflows = ?unavailable,
            "Built-in workflows have no handler and will fail when run"
        );
    }

    let executor = Arc::new(WorkflowExecutor::new(
        catalog.clone(),
        invoker,
        builtins,
        store.clone(),
    ));
    let scheduler = Arc::new(SchedulerEngine::new(executor.clone()));
    let deployments = Arc::new(DeploymentService::new(
        store,
        catalog.clone(),
        scheduler.clone(),
    ));

    let recovered = deployments
        .recover()
        .await
        .context("failed to recover deployment schedules")?;
    info!(recovered, "Startup recovery complete");

    let state = AppState {
        deployments,
        catalog,
        executor,
    };

    let app = routes::app(state)
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    Ok(())
}

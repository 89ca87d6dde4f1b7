//! OPAL Compute Node
//!
//! Runs one analytics job at a time on behalf of the OPAL control plane.
//!
//! Architecture:
//! - Configuration: loaded once from the environment
//! - Repositories: job store, analytics store, algorithm and aggregation services
//! - Services: pseudonymizing data fetcher, node status tracking
//! - Executor: per-job state machine driving fetch, spawn and finalization
//! - Controller: single-slot admission of run/cancel requests
//! - API: HTTP control surface (`/run`, `/cancel`, `/status`, `/health`)

mod api;
mod config;
mod controller;
mod db;
mod executor;
mod repository;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::controller::JobController;
use crate::executor::{ExecutionDeps, PythonRuntime, RuntimeRegistry};
use crate::repository::{AlgorithmRepository, PgEventRepository, PgJobRepository};
use crate::service::DataFetcher;
use opal_client::{AggregationClient, AlgorithmClient};
use opal_core::domain::job::JobType;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opal_compute=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting OPAL Compute Node");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);
    info!(
        "Loaded configuration: bind_addr={}, compute_types={:?}, max_cores={}",
        config.bind_addr, config.compute_types, config.max_cores
    );

    // Connect to both stores
    info!("Connecting to databases...");
    let jobs_pool = db::create_pool(&config.jobs_database_url)
        .await
        .context("Failed to create job database pool")?;
    db::run_migrations(&jobs_pool)
        .await
        .context("Failed to run database migrations")?;
    let analytics_pool = db::create_pool(&config.analytics_database_url)
        .await
        .context("Failed to create analytics database pool")?;

    // HTTP clients
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let algorithms: Arc<dyn AlgorithmRepository> = Arc::new(AlgorithmClient::with_client(
        config.algorithm_service_url.clone(),
        http.clone(),
    ));
    let aggregation = AggregationClient::with_client(config.aggregation_service_url.clone(), http);

    // Engine
    let deps = ExecutionDeps {
        config: config.clone(),
        jobs: Arc::new(PgJobRepository::new(jobs_pool)),
        aggregation: Arc::new(aggregation),
        fetcher: Arc::new(DataFetcher::new(
            Arc::new(PgEventRepository::new(analytics_pool)),
            config.max_users_per_fetch,
        )),
    };

    let mut registry = RuntimeRegistry::new(deps);
    let python_config = config.clone();
    registry.register(JobType::Python, move || {
        Box::new(PythonRuntime::new(python_config.clone(), algorithms.clone()))
    });

    let app = api::create_router(JobController::new(registry));

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

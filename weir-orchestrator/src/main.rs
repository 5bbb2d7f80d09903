use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weir_client::{CredentialClient, NodeClient};
use weir_orchestrator::api::{self, AppState};
use weir_orchestrator::config::Config;
use weir_orchestrator::db;
use weir_orchestrator::repository::{InMemoryPipelineStore, PgPipelineStore, PipelineStore};
use weir_orchestrator::service::{
    CredentialService, HttpCredentialService, InMemoryStatusSink, MonitoringRegistry,
    PipelineExecutor, RunningGraphRegistry, StatusSink, UnavailableCredentials,
};
use weir_orchestrator::submitter::HttpGraphSubmitter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weir_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Weir Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let store: Arc<dyn PipelineStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Arc::new(PgPipelineStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping pipelines in memory");
            Arc::new(InMemoryPipelineStore::new())
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.node_request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let submitter = Arc::new(HttpGraphSubmitter::new(
        NodeClient::with_client(http.clone()),
        config.max_concurrent_node_calls,
    ));

    let credentials: Arc<dyn CredentialService> = match &config.credentials_url {
        Some(url) => Arc::new(HttpCredentialService::new(CredentialClient::with_client(
            url.clone(),
            http,
        ))),
        None => {
            tracing::warn!("CREDENTIALS_URL not set, secrets will be deployed encrypted");
            Arc::new(UnavailableCredentials)
        }
    };

    let status: Arc<dyn StatusSink> = Arc::new(InMemoryStatusSink::new(config.status_history_limit));

    let executor = Arc::new(PipelineExecutor::new(
        submitter,
        Arc::new(RunningGraphRegistry::new()),
        credentials,
        store.clone(),
        status.clone(),
        Arc::new(MonitoringRegistry::new()),
    ));

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        executor,
        store,
        status,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

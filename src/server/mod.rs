use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::model::Definitions;
use handlers::{health_check, item_handler, list_endpoints_handler, page_handler, sparql_handler};
use models::EndpointInfo;

pub mod adapter;
pub mod executor;
pub mod handlers;
pub mod models;

pub use adapter::{AdapterError, SparqlModelAdapter};
pub use executor::{ExecutionError, HttpSparqlExecutor, QueryExecutor};
pub use models::{Page, SparqlPreview};

/// One served endpoint: its description and the adapter answering it.
pub struct EndpointState {
    pub info: EndpointInfo,
    pub adapter: SparqlModelAdapter,
}

pub struct AppState {
    pub endpoints: BTreeMap<String, EndpointState>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build every endpoint of `definitions`, asking `executor_for` for the
    /// executor of each SPARQL endpoint URL.
    ///
    /// Schemas and base queries are checked here, so a bad definition fails
    /// startup instead of the first request.
    pub fn new<F>(
        definitions: &Definitions,
        config: ServerConfig,
        mut executor_for: F,
    ) -> Result<Self, AdapterError>
    where
        F: FnMut(&str) -> Result<Arc<dyn QueryExecutor>, ExecutionError>,
    {
        definitions.validate()?;

        let mut executors: HashMap<String, Arc<dyn QueryExecutor>> = HashMap::new();
        let mut endpoints = BTreeMap::new();

        for definition in &definitions.endpoints {
            let schema =
                definitions.build_schema(&definition.model, config.root_truthiness_policy)?;

            let url = definition
                .sparql_endpoint
                .as_deref()
                .unwrap_or(&config.sparql_endpoint);
            let executor = match executors.get(url) {
                Some(executor) => executor.clone(),
                None => {
                    let executor = executor_for(url)?;
                    executors.insert(url.to_string(), executor.clone());
                    executor
                }
            };

            let info = EndpointInfo {
                name: definition.name.clone(),
                model: definition.model.clone(),
                grouped: schema.is_grouped(),
                description: definition.description.clone(),
                orderable_fields: schema.orderable_fields().keys().map(str::to_string).collect(),
            };
            let adapter = SparqlModelAdapter::new(definition.query.clone(), schema, executor)?
                .with_max_page_size(config.max_page_size);

            log::info!(
                "Registered endpoint '{}' (model '{}', SPARQL endpoint {})",
                definition.name,
                definition.model,
                url
            );
            endpoints.insert(definition.name.clone(), EndpointState { info, adapter });
        }

        Ok(AppState { endpoints, config })
    }

    /// Build the state with one HTTP executor per SPARQL endpoint URL.
    pub fn with_http_executors(
        definitions: &Definitions,
        config: ServerConfig,
    ) -> Result<Self, AdapterError> {
        let timeout = config.request_timeout();
        Self::new(definitions, config, |url| {
            Ok(Arc::new(HttpSparqlExecutor::new(url, timeout)?) as Arc<dyn QueryExecutor>)
        })
    }
}

pub fn router(app_state: Arc<AppState>) -> Router {
    let timeout = app_state.config.request_timeout();

    Router::new()
        .route("/health", get(health_check))
        .route("/endpoints", get(list_endpoints_handler))
        .route("/endpoints/{name}", get(page_handler))
        .route("/endpoints/{name}/item", get(item_handler))
        .route("/endpoints/{name}/sparql", get(sparql_handler))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(app_state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();

    // Load server configuration from environment variables
    let config = ServerConfig::from_env().context("Configuration error")?;
    run_with_config(config).await
}

pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    log::info!(
        "Server configuration: http={}:{}, sparql={}, definitions={}",
        config.http_host,
        config.http_port,
        config.sparql_endpoint,
        config.definitions_file.display()
    );

    let definitions = Definitions::from_yaml_file(&config.definitions_file).with_context(|| {
        format!(
            "Failed to load definitions from {}",
            config.definitions_file.display()
        )
    })?;
    let app_state = AppState::with_http_executors(&definitions, config.clone())
        .context("Failed to build endpoints")?;
    log::info!("Loaded {} endpoints", app_state.endpoints.len());

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    log::info!("Starting HTTP server on {}", http_bind_address);

    let http_listener = TcpListener::bind(&http_bind_address)
        .await
        .with_context(|| {
            format!(
                "Failed to bind HTTP listener to {} (is another process using port {}?)",
                http_bind_address, config.http_port
            )
        })?;
    log::info!("Successfully bound HTTP listener to {}", http_bind_address);

    axum::serve(http_listener, router(Arc::new(app_state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to register SIGTERM handler: {}. Falling back to Ctrl+C only.", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => log::info!("Received SIGTERM, shutting down..."),
            _ = tokio::signal::ctrl_c() => log::info!("Received SIGINT, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("Received shutdown signal, shutting down...");
    }
}

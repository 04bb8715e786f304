//! Server module for the PaperSearch serve crate

use crate::handlers::{handle_generate, handle_health_check, handle_search, AppState};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use papersearch_core::config::ServerConfig;
use papersearch_core::{Components, PaperSearchError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// PaperSearch HTTP server
pub struct PaperSearchServer {
    config: ServerConfig,
    app: Router,
}

impl PaperSearchServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let app = create_router(state, &config);
        Self { config, app }
    }

    /// Load the corpus table and wire the server from shared components
    pub async fn from_components(components: &Components) -> Result<Self> {
        let (service, _) = components.search_service().await?;

        let mut state = AppState::new(Arc::new(service))
            .with_ollama(components.client.clone())
            .with_default_related_count(components.config.generation.related_count);
        if let Some(generator) = &components.generator {
            state = state.with_generator(Arc::clone(generator));
        }

        Ok(Self::new(components.config.server.clone(), state))
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| PaperSearchError::validation(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting PaperSearch server on {}", addr);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| PaperSearchError::network(format!("Failed to bind to {}: {}", addr, e)))?;

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| PaperSearchError::network(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Build the router with middleware
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/search", post(handle_search))
        .route("/generate", post(handle_generate))
        .route("/health", get(handle_health_check))
        .with_state(state);

    app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.max_request_size)),
    );

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]);

        app = app.layer(cors);
    }

    app
}

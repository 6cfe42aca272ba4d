pub mod api;
pub mod config;
pub mod error;
pub mod live;

use axum::Router;
use chrono::Utc;
use pixelboard_core::PixelBoard;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::live::PixelFeed;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<PixelBoard>,
    pub feed: Arc<PixelFeed>,
}

impl AppState {
    /// Fresh board built from the configuration
    pub fn new(config: &Config) -> Self {
        Self {
            board: Arc::new(PixelBoard::new(config.board.clone(), Utc::now())),
            feed: Arc::new(PixelFeed::new()),
        }
    }
}

/// Build the router with all routes and middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .merge(live::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the server with the given configuration
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config);

    tracing::info!(
        width = config.board.width,
        height = config.board.height,
        cooldown_secs = config.board.cooldown.num_seconds(),
        "Canvas created"
    );

    let app = app(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

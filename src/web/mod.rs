//! HTTP surface
//!
//! Serves the published playlists, a manual rebuild trigger and a status
//! endpoint. Playlist handlers only read files written by the rebuild
//! pipeline and never wait on a build.

use anyhow::Result;
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::WebConfig;
use crate::ingestor::RebuildService;
use crate::proxy::PlaylistFormat;

pub mod handlers;
pub mod responses;

pub use responses::{ApiResponse, handle_error};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub rebuild: Arc<RebuildService>,
    /// Start a background build when a playlist file is missing
    pub build_on_missing_output: bool,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(rebuild: Arc<RebuildService>, build_on_missing_output: bool) -> Self {
        Self {
            rebuild,
            build_on_missing_output,
            start_time: Utc::now(),
        }
    }
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Serve until `cancellation_token` fires
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;
        info!("Web server listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}

/// Router with one route per playlist and encoding plus the API
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes());

    for definition in state.rebuild.playlists() {
        for format in PlaylistFormat::ALL {
            let path = format!("/{}.{}", definition.route, format.extension());
            let definition = definition.clone();
            router = router.route(
                &path,
                get(move |State(state): State<AppState>| {
                    handlers::playlists::serve_playlist(state, definition.clone(), format)
                }),
            );
        }
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(handlers::builds::trigger_refresh))
        .route("/status", get(handlers::builds::build_status))
}

use crate::auth::AuthGate;
use crate::config::Config;
use crate::delivery::DeliveryAdapter;
use crate::webify::{ArtifactStore, Transcoder};
use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use fileserve_av::{MediaClassifier, MediaToolkit};
use fileserve_db::ShareRepository;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_share;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub repository: Arc<dyn ShareRepository>,
    pub gate: AuthGate,
    pub classifier: MediaClassifier,
    /// Shared with batch runs so concurrent requests coalesce
    pub transcoder: Transcoder,
    pub delivery: DeliveryAdapter,
}

impl AppContext {
    pub fn new(
        config: Config,
        repository: Arc<dyn ShareRepository>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Self {
        let transcoder = Transcoder::new(
            toolkit.clone(),
            ArtifactStore::from_config(&config.storage),
            config.encoding.settings(),
        );
        Self {
            gate: AuthGate::new(repository.clone()),
            classifier: MediaClassifier::new(toolkit),
            delivery: DeliveryAdapter::from_config(&config.delivery),
            transcoder,
            repository,
            config: Arc::new(config),
        }
    }
}

/// API routes plus, when configured, the login/browse frontend. Unknown paths
/// fall back to the frontend's `index.html` so `/?share=...` links resolve.
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api", routes_share::share_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    match static_dir.filter(|dir| dir.is_dir()) {
        Some(dir) => {
            tracing::info!("Serving frontend from {:?}", dir);
            let index = ServeFile::new(dir.join("index.html"));
            app.fallback_service(ServeDir::new(dir).not_found_service(index))
        }
        None => app,
    }
}

/// Bind the configured address and serve until SIGINT or SIGTERM.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let server = &ctx.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;
    let app = create_router(ctx.clone(), server.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    tracing::info!("Shutting down");
}

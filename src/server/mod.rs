//! HTTP surface: `POST /diffexp` and `GET /health`

mod handlers;

pub use handlers::{diffexp, health_check, ApiError, HealthResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::engine::NbGlmEngine;
use crate::error::Result;
use crate::provider::DatasetCatalog;
use crate::service::DiffExpService;

/// The service the server runs: dataset catalog plus the built-in engine
pub type DefaultService = DiffExpService<DatasetCatalog, NbGlmEngine>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DefaultService>,
}

impl AppState {
    pub fn new(service: DefaultService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/diffexp", post(diffexp))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr: SocketAddr = listener.local_addr()?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

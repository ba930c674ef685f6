//! smap-api library - SMAP compliance tracking service
//!
//! Exposes the application state and router so integration tests can drive
//! the full HTTP surface against an in-memory database.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod db;
pub mod error;
pub mod import;
pub mod pagination;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health::health_routes())
        .nest("/api/master-klausul", api::klausul::routes())
        .nest("/api/master-pilar", api::pilar::routes())
        .nest("/api/master-elemen", api::elemen::routes())
        .nest("/api/master-sub-elemen", api::sub_elemen::routes())
        .nest("/api/pengukuran-master", api::pengukuran::routes())
        .nest("/api/pelaksanaan-semester", api::pelaksanaan::routes())
        .nest("/api/import", api::import::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

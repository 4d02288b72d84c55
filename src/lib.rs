//! Library crate for matchday-back, exposing modules for binaries and integration tests.

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Booking policy configuration.
pub mod config;
/// Persistence: entities, store traits and backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service errors and their HTTP mapping.
pub mod error;
/// HTTP handlers and router composition.
pub mod routes;
/// Application services orchestrating state and storage.
pub mod services;
/// Shared application state and pure domain rules.
pub mod state;

/// Build the top-level router and attach cross-cutting middleware layers.
pub fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Caller identity extraction.
pub mod auth;
/// Coach slot and booking routes.
pub mod coach;
/// Game routes.
pub mod game;
/// Healthcheck route.
pub mod health;
/// Join-request routes, current and legacy.
pub mod join_request;

/// Compose all route trees, wiring in shared state and the Swagger UI.
pub fn router(state: SharedState) -> Router<()> {
    let docs: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    health::router()
        .merge(game::router())
        .merge(join_request::router())
        .merge(coach::router())
        .merge(docs)
        .with_state(state)
}

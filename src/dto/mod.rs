/// Coach slot and booking payloads.
pub mod coach;
/// Shared envelopes.
pub mod common;
/// Game payloads, queries and views.
pub mod game;
/// Healthcheck payloads.
pub mod health;
/// Join-request responses.
pub mod join_request;
/// Custom validators used by request DTOs.
pub mod validation;

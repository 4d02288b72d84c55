/// Coach slot and booking operations.
pub mod coach_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle operations and the optimistic write loop.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Join-request operations.
pub mod join_request_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether storage-backed routes are served, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_stores().await {
        Ok(stores) => {
            if let Err(err) = stores.games.health_check().await {
                warn!(error = %err, "storage health check failed");
                return HealthResponse::degraded();
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

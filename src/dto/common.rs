use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement for operations that return no payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl ActionResponse {
    /// Successful acknowledgement carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

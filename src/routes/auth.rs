use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the user id resolved by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, as forwarded by the auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing caller identity header `{USER_ID_HEADER}`"))
            })?;

        Uuid::parse_str(raw)
            .map(CurrentUser)
            .map_err(|_| AppError::Unauthorized("invalid caller identity".into()))
    }
}

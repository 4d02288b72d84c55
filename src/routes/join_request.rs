//! Join-request endpoints. The legacy `/join`, `/approve/{userId}` and
//! `/reject/{userId}` routes share handlers with the current
//! `/joinrequests` routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::{
        game::JoinRequestView,
        join_request::{ApprovalResponse, JoinRequestListResponse, JoinRequestResponse},
    },
    error::AppError,
    routes::auth::CurrentUser,
    services::{game_service, join_request_service},
    state::SharedState,
};

/// Join-request endpoints under `/games/{id}`, plus the legacy action routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/games/{id}/joinrequests",
            post(create_join_request)
                .get(list_join_requests)
                .delete(cancel_join_request),
        )
        .route(
            "/games/{id}/joinrequests/{userId}/approve",
            post(approve_join_request),
        )
        .route(
            "/games/{id}/joinrequests/{userId}/reject",
            post(reject_join_request),
        )
        .route("/games/{id}/join", post(legacy_join))
        .route("/games/{id}/approve/{userId}", post(legacy_approve))
        .route("/games/{id}/reject/{userId}", post(legacy_reject))
}

/// Ask to join a game.
#[utoipa::path(
    post,
    path = "/games/{id}/joinrequests",
    tag = "join-requests",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Join request filed", body = JoinRequestResponse),
        (status = 400, description = "Host, closed, started, duplicate or overlapping"),
        (status = 404, description = "Unknown game"),
    )
)]
pub async fn create_join_request(
    State(state): State<SharedState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<JoinRequestResponse>), AppError> {
    let status = join_request_service::create(&state, id, requester).await?;
    Ok((
        StatusCode::CREATED,
        Json(JoinRequestResponse::new(
            "join request sent",
            id,
            requester,
            Some(status),
        )),
    ))
}

/// Approve a pending join request. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/joinrequests/{userId}/approve",
    tag = "join-requests",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("userId" = Uuid, Path, description = "Requesting player"),
    ),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Request approved", body = ApprovalResponse),
        (status = 400, description = "Not pending, game full, closed or overlapping"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown game or request"),
    )
)]
pub async fn approve_join_request(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApprovalResponse>, AppError> {
    let approval = join_request_service::approve(&state, id, user_id, caller).await?;
    Ok(Json(ApprovalResponse::new(id, user_id, approval)))
}

/// Reject a pending join request. Host only; the player cannot ask again.
#[utoipa::path(
    post,
    path = "/games/{id}/joinrequests/{userId}/reject",
    tag = "join-requests",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("userId" = Uuid, Path, description = "Requesting player"),
    ),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Request rejected", body = JoinRequestResponse),
        (status = 400, description = "Not pending or game closed"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown game or request"),
    )
)]
pub async fn reject_join_request(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<JoinRequestResponse>, AppError> {
    let status = join_request_service::reject(&state, id, user_id, caller).await?;
    Ok(Json(JoinRequestResponse::new(
        "join request rejected",
        id,
        user_id,
        Some(status),
    )))
}

/// Withdraw the caller's own pending request.
#[utoipa::path(
    delete,
    path = "/games/{id}/joinrequests",
    tag = "join-requests",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Request withdrawn", body = JoinRequestResponse),
        (status = 400, description = "Not pending or too close to the start"),
        (status = 404, description = "Unknown game or request"),
    )
)]
pub async fn cancel_join_request(
    State(state): State<SharedState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JoinRequestResponse>, AppError> {
    join_request_service::cancel(&state, id, requester).await?;
    Ok(Json(JoinRequestResponse::new(
        "join request cancelled",
        id,
        requester,
        None,
    )))
}

/// Join requests of a game. Host only.
#[utoipa::path(
    get,
    path = "/games/{id}/joinrequests",
    tag = "join-requests",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Join requests in arrival order", body = JoinRequestListResponse),
        (status = 403, description = "Caller is not the host"),
    )
)]
pub async fn list_join_requests(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JoinRequestListResponse>, AppError> {
    let join_requests: Vec<JoinRequestView> =
        game_service::list_join_requests(&state, id, caller).await?;
    Ok(Json(JoinRequestListResponse {
        success: true,
        game_id: id,
        join_requests,
    }))
}

/// Legacy shape of [`create_join_request`].
#[utoipa::path(
    post,
    path = "/games/{id}/join",
    tag = "join-requests",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses((status = 201, description = "Join request filed", body = JoinRequestResponse))
)]
pub async fn legacy_join(
    state: State<SharedState>,
    caller: CurrentUser,
    path: Path<Uuid>,
) -> Result<(StatusCode, Json<JoinRequestResponse>), AppError> {
    create_join_request(state, caller, path).await
}

/// Legacy shape of [`approve_join_request`].
#[utoipa::path(
    post,
    path = "/games/{id}/approve/{userId}",
    tag = "join-requests",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("userId" = Uuid, Path, description = "Requesting player"),
    ),
    security(("user_id" = [])),
    responses((status = 200, description = "Request approved", body = ApprovalResponse))
)]
pub async fn legacy_approve(
    state: State<SharedState>,
    caller: CurrentUser,
    path: Path<(Uuid, Uuid)>,
) -> Result<Json<ApprovalResponse>, AppError> {
    approve_join_request(state, caller, path).await
}

/// Legacy shape of [`reject_join_request`].
#[utoipa::path(
    post,
    path = "/games/{id}/reject/{userId}",
    tag = "join-requests",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("userId" = Uuid, Path, description = "Requesting player"),
    ),
    security(("user_id" = [])),
    responses((status = 200, description = "Request rejected", body = JoinRequestResponse))
)]
pub async fn legacy_reject(
    state: State<SharedState>,
    caller: CurrentUser,
    path: Path<(Uuid, Uuid)>,
) -> Result<Json<JoinRequestResponse>, AppError> {
    reject_join_request(state, caller, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::JoinRequestStatus;

    #[test]
    fn withdrawn_response_omits_status() {
        let response = JoinRequestResponse::new(
            "join request cancelled",
            Uuid::nil(),
            Uuid::nil(),
            None,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("status").is_none());

        let filed = JoinRequestResponse::new(
            "join request sent",
            Uuid::nil(),
            Uuid::nil(),
            Some(JoinRequestStatus::Pending),
        );
        assert_eq!(serde_json::to_value(&filed).unwrap()["status"], "pending");
    }
}

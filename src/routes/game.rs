use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::game::{CreateGameRequest, GameListResponse, GameResponse, ListGamesQuery},
    error::AppError,
    routes::auth::CurrentUser,
    services::game_service,
    state::SharedState,
};

/// Game creation, discovery and lifecycle endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/cancel", post(cancel_game))
        .route("/games/{id}/complete", post(complete_game))
}

/// Open a game on a booked venue slot; the caller becomes its host.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Game created", body = GameResponse),
        (status = 400, description = "Invalid payload or overlapping game"),
        (status = 401, description = "Missing caller identity"),
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    CurrentUser(host): CurrentUser,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameResponse>), AppError> {
    payload.validate()?;
    let game = game_service::create_game(&state, host, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(GameResponse::new(Some("game created"), game)),
    ))
}

/// List open games that still have room.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    params(ListGamesQuery),
    responses((status = 200, description = "Matching games, earliest first", body = GameListResponse))
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GameListResponse>, AppError> {
    let games = game_service::list_games(&state, query).await?;
    Ok(Json(games.into()))
}

/// Retrieve a game by its ID.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game", body = GameResponse),
        (status = 404, description = "Unknown game"),
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    let game = game_service::get_game(&state, id).await?;
    Ok(Json(GameResponse::new(None, game)))
}

/// Cancel a game. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/cancel",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Game cancelled", body = GameResponse),
        (status = 403, description = "Caller is not the host"),
    )
)]
pub async fn cancel_game(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    let game = game_service::cancel_game(&state, id, caller).await?;
    Ok(Json(GameResponse::new(Some("game cancelled"), game)))
}

/// Mark a finished game as completed. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/complete",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Game completed", body = GameResponse),
        (status = 400, description = "Game has not ended or is already terminal"),
        (status = 403, description = "Caller is not the host"),
    )
)]
pub async fn complete_game(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameResponse>, AppError> {
    let game = game_service::complete_game(&state, id, caller).await?;
    Ok(Json(GameResponse::new(Some("game completed"), game)))
}

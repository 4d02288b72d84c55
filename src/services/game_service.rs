use std::time::Duration as StdDuration;

use rand::{Rng, rng};
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameFilter, GeoQuery, Stores},
        models::{
            BookingStatus, GameEntity, GameSlotEntity, GameStatus, GeoPoint, PlayersNeeded,
            VenueRefEntity,
        },
        storage::StorageError,
    },
    dto::{
        game::{CreateGameRequest, GameView, JoinRequestView, ListGamesQuery},
        validation::parse_date,
    },
    error::ServiceError,
    state::{
        SharedState,
        game::{apply_game_event, find_overlap},
        sport::price_for_sport,
        state_machine::GameEvent,
    },
};

/// Upper bound of the first retry pause; doubles per attempt.
const RETRY_BASE_MS: u64 = 10;

/// Open a new game hosted by `host`. The host is the first approved player.
pub async fn create_game(
    state: &SharedState,
    host: Uuid,
    request: CreateGameRequest,
) -> Result<GameView, ServiceError> {
    let stores = state.require_stores().await?;
    let now = state.now();
    let game = build_game(host, request, now)?;

    let _guard = state.user_locks().lock(host).await;
    let host_games = stores.games.find_active_games_for_user(host).await?;
    if let Some(conflict) = find_overlap(&game.window(), &host_games) {
        return Err(ServiceError::Conflict(format!(
            "time slot overlaps with game `{}`",
            conflict.id
        )));
    }

    stores.games.insert_game(game.clone()).await?;
    info!(game_id = %game.id, host = %host, sport = game.sport.display_name(), "game created");
    Ok(GameView::from(&game))
}

/// Open games with room left that match `query`, earliest first.
pub async fn list_games(
    state: &SharedState,
    query: ListGamesQuery,
) -> Result<Vec<GameView>, ServiceError> {
    let filter = build_filter(query, state.config().default_search_radius_m)?;
    let stores = state.require_stores().await?;
    let games = stores.games.list_open_games(filter).await?;
    Ok(games.iter().map(GameView::from).collect())
}

/// Load one game; unknown ids map to 404.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameView, ServiceError> {
    let stores = state.require_stores().await?;
    let game = load_game(&stores, id).await?;
    Ok(GameView::from(&game))
}

/// Cancel a game that has not reached a terminal status. Host only.
pub async fn cancel_game(
    state: &SharedState,
    id: Uuid,
    caller: Uuid,
) -> Result<GameView, ServiceError> {
    let game = mutate_game(state, id, |game, now| {
        ensure_host(game, caller)?;
        lifecycle_event(game, GameEvent::Cancel, now)
    })
    .await?;
    info!(game_id = %id, "game cancelled");
    Ok(GameView::from(&game))
}

/// Mark a game as played once its slot has ended. Host only.
pub async fn complete_game(
    state: &SharedState,
    id: Uuid,
    caller: Uuid,
) -> Result<GameView, ServiceError> {
    let game = mutate_game(state, id, |game, now| {
        ensure_host(game, caller)?;
        if now < game.slot.end_time {
            return Err(ServiceError::Conflict("game has not ended yet".into()));
        }
        lifecycle_event(game, GameEvent::Complete, now)
    })
    .await?;
    info!(game_id = %id, "game completed");
    Ok(GameView::from(&game))
}

/// Move a game to `NeedsHostAction`, taking it out of the join flow.
///
/// Entry point for the venue and payment collaborators.
pub async fn flag_needs_host_action(
    state: &SharedState,
    id: Uuid,
) -> Result<GameView, ServiceError> {
    let game = mutate_game(state, id, |game, now| {
        lifecycle_event(game, GameEvent::FlagForHost, now)
    })
    .await?;
    warn!(game_id = %id, "game flagged for host action");
    Ok(GameView::from(&game))
}

/// Record the venue payment outcome reported by the payment collaborator.
pub async fn set_booking_status(
    state: &SharedState,
    id: Uuid,
    booking_status: BookingStatus,
) -> Result<GameView, ServiceError> {
    let game = mutate_game(state, id, |game, now| {
        game.booking_status = booking_status;
        game.updated_at = now;
        Ok(())
    })
    .await?;
    Ok(GameView::from(&game))
}

/// Join requests of a game in arrival order. Host only.
pub async fn list_join_requests(
    state: &SharedState,
    id: Uuid,
    caller: Uuid,
) -> Result<Vec<JoinRequestView>, ServiceError> {
    let stores = state.require_stores().await?;
    let game = load_game(&stores, id).await?;
    ensure_host(&game, caller)?;
    Ok(game.join_requests.iter().map(JoinRequestView::from).collect())
}

/// Read-modify-write a game with optimistic concurrency.
///
/// `apply` runs against a fresh copy on every attempt, so every precondition
/// is re-evaluated after a lost race. Rule violations abort immediately.
pub(crate) async fn mutate_game<F>(
    state: &SharedState,
    id: Uuid,
    mut apply: F,
) -> Result<GameEntity, ServiceError>
where
    F: FnMut(&mut GameEntity, OffsetDateTime) -> Result<(), ServiceError>,
{
    let stores = state.require_stores().await?;
    let attempts = state.config().max_write_retries.max(1);

    for attempt in 1..=attempts {
        let mut game = load_game(&stores, id).await?;
        apply(&mut game, state.now())?;

        match stores.games.replace_game(game).await {
            Ok(saved) => return Ok(saved),
            Err(StorageError::VersionConflict { expected, .. }) => {
                debug!(game_id = %id, attempt, expected, "game write raced; retrying");
                if attempt < attempts {
                    sleep(retry_delay(attempt)).await;
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(game_id = %id, attempts, "game write retries exhausted");
    Err(ServiceError::Conflict(
        "game was modified concurrently; please retry".into(),
    ))
}

pub(crate) async fn load_game(stores: &Stores, id: Uuid) -> Result<GameEntity, ServiceError> {
    stores
        .games
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

fn retry_delay(attempt: u32) -> StdDuration {
    let ceiling = RETRY_BASE_MS << attempt.min(6);
    StdDuration::from_millis(rng().random_range(0..=ceiling))
}

fn ensure_host(game: &GameEntity, caller: Uuid) -> Result<(), ServiceError> {
    if game.host != caller {
        return Err(ServiceError::Forbidden(
            "only the host can manage this game".into(),
        ));
    }
    Ok(())
}

fn lifecycle_event(
    game: &mut GameEntity,
    event: GameEvent,
    now: OffsetDateTime,
) -> Result<(), ServiceError> {
    apply_game_event(game, event, now).map_err(|invalid| ServiceError::Conflict(invalid.to_string()))
}

fn build_game(
    host: Uuid,
    request: CreateGameRequest,
    now: OffsetDateTime,
) -> Result<GameEntity, ServiceError> {
    let CreateGameRequest {
        sport,
        description,
        players_needed,
        time_slot,
        venue_location,
        venue_id,
        city,
        sub_venue_id,
        sub_venue_name,
        sport_prices,
    } = request;

    if sport.is_blank() {
        return Err(ServiceError::Validation("sport must not be empty".into()));
    }
    if time_slot.start_time >= time_slot.end_time {
        return Err(ServiceError::Validation(
            "endTime must be after startTime".into(),
        ));
    }
    if time_slot.start_time <= now {
        return Err(ServiceError::Validation(
            "time slot must start in the future".into(),
        ));
    }

    let date = match time_slot.date.as_deref() {
        Some(value) => parse_date(value)
            .map_err(|_| ServiceError::Validation(format!("`{value}` is not a YYYY-MM-DD date")))?,
        None => time_slot.start_time.date(),
    };
    let price = time_slot
        .price
        .or_else(|| price_for_sport(&sport_prices, &sport));
    let [lng, lat] = venue_location.coordinates;

    Ok(GameEntity {
        id: Uuid::new_v4(),
        host,
        sport,
        description: description.trim().to_owned(),
        venue: VenueRefEntity {
            venue_id,
            city,
            location: GeoPoint { lng, lat },
            sub_venue_id,
            sub_venue_name,
        },
        slot: GameSlotEntity {
            time_slot_document_id: time_slot.time_slot_document_id,
            slot_id: time_slot.slot_id,
            date,
            start_time: time_slot.start_time,
            end_time: time_slot.end_time,
            price,
        },
        players_needed: PlayersNeeded {
            min: players_needed.min,
            max: players_needed.max,
        },
        approved_players: vec![host],
        join_requests: Vec::new(),
        status: GameStatus::Open,
        booking_status: BookingStatus::NotBooked,
        version: 0,
        created_at: now,
        updated_at: now,
    })
}

fn build_filter(query: ListGamesQuery, default_radius_m: f64) -> Result<GameFilter, ServiceError> {
    let parse = |label: &str, value: Option<String>| {
        value
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                parse_date(&value).map_err(|_| {
                    ServiceError::Validation(format!("{label} `{value}` is not a YYYY-MM-DD date"))
                })
            })
            .transpose()
    };
    let start_date = parse("startDate", query.start_date)?;
    let end_date = parse("endDate", query.end_date)?;

    let near = match (query.lng, query.lat) {
        (Some(lng), Some(lat)) => {
            if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
                return Err(ServiceError::Validation(
                    "lng/lat are out of range".into(),
                ));
            }
            let radius_m = query.radius.unwrap_or(default_radius_m);
            if !radius_m.is_finite() || radius_m <= 0.0 {
                return Err(ServiceError::Validation("radius must be positive".into()));
            }
            Some(GeoQuery {
                center: GeoPoint { lng, lat },
                radius_m,
            })
        }
        (None, None) => None,
        _ => {
            return Err(ServiceError::Validation(
                "lng and lat must be provided together".into(),
            ));
        }
    };

    Ok(GameFilter {
        sport: query.sport.filter(|sport| !sport.trim().is_empty()),
        venue_id: query.venue_id,
        start_date,
        end_date,
        min_price: query.min_price,
        max_price: query.max_price,
        near,
    })
}

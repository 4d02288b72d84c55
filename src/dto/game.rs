use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        BookingStatus, GameEntity, GameStatus, JoinRequestEntity, JoinRequestStatus,
        PlayersNeeded,
    },
    dto::validation::{validate_players_needed, validate_time_slot, validate_venue_location},
    state::sport::{SportPrice, SportRef},
};

/// Payload used by a host to open a new game on a booked venue slot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Either a plain sport name or a `{key, name}` reference.
    pub sport: SportRef,
    /// Free text shown on the listing.
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    /// Capacity bounds.
    #[validate(nested)]
    pub players_needed: PlayersNeededInput,
    /// Booked venue slot.
    #[validate(nested)]
    pub time_slot: TimeSlotInput,
    /// Venue position.
    #[validate(nested)]
    pub venue_location: VenueLocationInput,
    /// Venue identifier.
    pub venue_id: Option<String>,
    /// Venue city.
    pub city: Option<String>,
    /// Court or pitch identifier.
    pub sub_venue_id: Option<String>,
    /// Court or pitch name.
    pub sub_venue_name: Option<String>,
    /// Sub-venue price list; consulted when `timeSlot.price` is omitted.
    #[serde(default)]
    pub sport_prices: Vec<SportPrice>,
}

/// Capacity bounds requested by the host, host included.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_players_needed"))]
pub struct PlayersNeededInput {
    /// Smallest acceptable roster.
    #[validate(range(min = 1))]
    pub min: u32,
    /// Roster capacity.
    #[validate(range(min = 2, max = 100))]
    pub max: u32,
}

/// Venue time slot the game is played in.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_slot"))]
pub struct TimeSlotInput {
    /// RFC 3339 start; must lie in the future.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub start_time: OffsetDateTime,
    /// RFC 3339 end; after `startTime`.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub end_time: OffsetDateTime,
    /// `YYYY-MM-DD`; defaults to the date of `startTime`.
    pub date: Option<String>,
    /// Slot price.
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    /// Venue-side slot identifier.
    pub slot_id: Option<String>,
    /// Venue-side schedule document.
    pub time_slot_document_id: Option<String>,
}

/// GeoJSON point of the venue.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[validate(schema(function = "validate_venue_location"))]
pub struct VenueLocationInput {
    /// Must be `Point`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

/// Filters accepted by the game listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListGamesQuery {
    /// Case-insensitive substring of the sport key or name.
    pub sport: Option<String>,
    /// Exact venue identifier.
    pub venue_id: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub end_date: Option<String>,
    /// Lowest price.
    pub min_price: Option<f64>,
    /// Highest price.
    pub max_price: Option<f64>,
    /// Longitude of the search origin.
    pub lng: Option<f64>,
    /// Latitude of the search origin.
    pub lat: Option<f64>,
    /// Search radius in meters.
    pub radius: Option<f64>,
}

/// Venue reference exposed to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VenueView {
    /// Venue identifier.
    pub venue_id: Option<String>,
    /// Venue city.
    pub city: Option<String>,
    /// GeoJSON point.
    pub location: VenueLocationInput,
    /// Court or pitch identifier.
    pub sub_venue_id: Option<String>,
    /// Court or pitch name.
    pub sub_venue_name: Option<String>,
}

/// Time slot exposed to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotView {
    /// Venue-side schedule document.
    pub time_slot_document_id: Option<String>,
    /// Venue-side slot identifier.
    pub slot_id: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Slot start.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub start_time: OffsetDateTime,
    /// Slot end.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub end_time: OffsetDateTime,
    /// Slot price.
    pub price: Option<f64>,
}

/// Public projection of a game.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// Game id.
    pub id: Uuid,
    /// Hosting user.
    pub host: Uuid,
    /// Sport played.
    pub sport: SportRef,
    /// Host description.
    pub description: String,
    /// Where it is played.
    pub venue: VenueView,
    /// When it is played.
    pub time_slot: TimeSlotView,
    /// Capacity bounds.
    pub players_needed: PlayersNeeded,
    /// Roster, host first.
    pub approved_players: Vec<Uuid>,
    /// Roster size.
    pub approved_count: usize,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Venue booking status.
    pub booking_status: BookingStatus,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    /// Last write.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<&GameEntity> for GameView {
    fn from(game: &GameEntity) -> Self {
        Self {
            id: game.id,
            host: game.host,
            sport: game.sport.clone(),
            description: game.description.clone(),
            venue: VenueView {
                venue_id: game.venue.venue_id.clone(),
                city: game.venue.city.clone(),
                location: VenueLocationInput {
                    kind: "Point".into(),
                    coordinates: [game.venue.location.lng, game.venue.location.lat],
                },
                sub_venue_id: game.venue.sub_venue_id.clone(),
                sub_venue_name: game.venue.sub_venue_name.clone(),
            },
            time_slot: TimeSlotView {
                time_slot_document_id: game.slot.time_slot_document_id.clone(),
                slot_id: game.slot.slot_id.clone(),
                date: game.slot.date.to_string(),
                start_time: game.slot.start_time,
                end_time: game.slot.end_time,
                price: game.slot.price,
            },
            players_needed: game.players_needed,
            approved_players: game.approved_players.clone(),
            approved_count: game.approved_players.len(),
            status: game.status,
            booking_status: game.booking_status,
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

/// One join request as seen by the host.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestView {
    /// Requesting player.
    pub user: Uuid,
    /// Request status.
    pub status: JoinRequestStatus,
    /// When the request was filed.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub requested_at: OffsetDateTime,
}

impl From<&JoinRequestEntity> for JoinRequestView {
    fn from(request: &JoinRequestEntity) -> Self {
        Self {
            user: request.user,
            status: request.status,
            requested_at: request.requested_at,
        }
    }
}

/// Envelope around a single game.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct GameResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome summary.
    pub message: Option<String>,
    /// The game.
    pub game: GameView,
}

impl GameResponse {
    /// Successful envelope around `game`.
    pub fn new(message: Option<&str>, game: GameView) -> Self {
        Self {
            success: true,
            message: message.map(str::to_owned),
            game,
        }
    }
}

/// Envelope around the game listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListResponse {
    /// Always `true`.
    pub success: bool,
    /// Number of games.
    pub count: usize,
    /// Matching games, earliest first.
    pub games: Vec<GameView>,
}

impl From<Vec<GameView>> for GameListResponse {
    fn from(games: Vec<GameView>) -> Self {
        Self {
            success: true,
            count: games.len(),
            games,
        }
    }
}

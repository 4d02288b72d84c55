/// Process-local backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use futures::future::BoxFuture;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::dao::models::{
    CoachBookingEntity, CoachBookingStatus, CoachSlotEntity, GameEntity, GameStatus, GeoPoint,
};
use crate::dao::storage::StorageResult;
use crate::state::game::has_room;

const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Abstraction over the persistence layer for games.
///
/// Writes are conditional: `replace_game` only succeeds when the persisted
/// version still equals `game.version`, and persists the game with the
/// version bumped by one.
pub trait GameStore: Send + Sync {
    /// Persist a new game.
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Conditionally overwrite a game; fails with `VersionConflict` on a stale version.
    fn replace_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<GameEntity>>;
    /// Open games with room that match `filter`, earliest first.
    fn list_open_games(
        &self,
        filter: GameFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Open or full games in which `user` is an approved player.
    fn find_active_games_for_user(
        &self,
        user: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Cheap round-trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Abstraction over the persistence layer for coach slots and bookings.
pub trait CoachStore: Send + Sync {
    /// Insert a slot; duplicates of `(coach, date, start, end)` fail with `Duplicate`.
    fn insert_slot(&self, slot: CoachSlotEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a slot by id.
    fn find_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CoachSlotEntity>>>;
    /// Slots matching `filter`, earliest first.
    fn list_slots(
        &self,
        filter: SlotFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachSlotEntity>>>;
    /// Delete the slot only while it is unbooked; returns whether a slot was removed.
    fn delete_unbooked_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Flip `is_booked` from false to true for `player`; returns false if already booked or gone.
    fn claim_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Undo a claim made by `player`; returns false if the slot is not held by them.
    fn release_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Persist a new booking.
    fn insert_booking(&self, booking: CoachBookingEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a booking by id.
    fn find_booking(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CoachBookingEntity>>>;
    /// Bookings matching `filter`, oldest first.
    fn list_bookings(
        &self,
        filter: BookingFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachBookingEntity>>>;
    /// Apply `transition`; returns false if the booking was no longer in `transition.from`.
    fn transition_booking(
        &self,
        id: Uuid,
        transition: BookingTransition,
    ) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Conditional status change for a coach booking.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingTransition {
    /// Status the booking must still have.
    pub from: CoachBookingStatus,
    /// Status written on success.
    pub to: CoachBookingStatus,
    /// Stored only when present.
    pub rejection_reason: Option<String>,
    /// Written to `updated_at`.
    pub at: OffsetDateTime,
}

/// Handles to every store backed by the same connection.
#[derive(Clone)]
pub struct Stores {
    /// Game persistence.
    pub games: Arc<dyn GameStore>,
    /// Coach slot and booking persistence.
    pub coaching: Arc<dyn CoachStore>,
}

/// Search criteria for the public game listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    /// Case-insensitive substring of the sport key or name.
    pub sport: Option<String>,
    /// Exact venue identifier.
    pub venue_id: Option<String>,
    /// Earliest slot date, inclusive.
    pub start_date: Option<Date>,
    /// Latest slot date, inclusive.
    pub end_date: Option<Date>,
    /// Lowest price; unpriced games are excluded when set.
    pub min_price: Option<f64>,
    /// Highest price; unpriced games are excluded when set.
    pub max_price: Option<f64>,
    /// Geographic restriction.
    pub near: Option<GeoQuery>,
}

/// Circle around a point, radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoQuery {
    /// Search origin.
    pub center: GeoPoint,
    /// Search radius in meters.
    pub radius_m: f64,
}

impl GeoQuery {
    /// Radius expressed in radians on a spherical earth.
    pub fn radius_radians(&self) -> f64 {
        self.radius_m / EARTH_RADIUS_M
    }

    /// Whether `point` lies inside the circle.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        distance_m(&self.center, point) <= self.radius_m
    }
}

impl GameFilter {
    /// Whether the game is listed: open, with room left, and matching every criterion.
    pub fn matches(&self, game: &GameEntity) -> bool {
        if game.status != GameStatus::Open || !has_room(game) {
            return false;
        }
        if let Some(sport) = &self.sport
            && !game.sport.matches_query(sport)
        {
            return false;
        }
        if let Some(venue_id) = &self.venue_id
            && game.venue.venue_id.as_deref() != Some(venue_id.as_str())
        {
            return false;
        }
        if self.start_date.is_some_and(|start| game.slot.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| game.slot.date > end) {
            return false;
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = game.slot.price else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }
        if let Some(near) = &self.near
            && !near.contains(&game.venue.location)
        {
            return false;
        }
        true
    }
}

/// Criteria for listing coach slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    /// Only slots of this coach.
    pub coach_id: Option<Uuid>,
    /// Only slots on this date.
    pub date: Option<Date>,
    /// Skip booked slots.
    pub available_only: bool,
}

impl SlotFilter {
    /// Whether `slot` satisfies every criterion.
    pub fn matches(&self, slot: &CoachSlotEntity) -> bool {
        self.coach_id.is_none_or(|coach| slot.coach_id == coach)
            && self.date.is_none_or(|date| slot.date == date)
            && !(self.available_only && slot.is_booked)
    }
}

/// Selects bookings by one side of the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingFilter {
    /// Bookings on this coach's slots.
    Coach(Uuid),
    /// Bookings made by this player.
    Player(Uuid),
    /// Bookings of one player for one slot.
    PlayerSlot { player: Uuid, slot: Uuid },
    /// Accepted bookings of one player.
    AcceptedForPlayer(Uuid),
}

impl BookingFilter {
    /// Whether `booking` is selected.
    pub fn matches(&self, booking: &CoachBookingEntity) -> bool {
        match *self {
            BookingFilter::Coach(coach) => booking.coach_id == coach,
            BookingFilter::Player(player) => booking.player_id == player,
            BookingFilter::PlayerSlot { player, slot } => {
                booking.player_id == player && booking.slot_id == slot
            }
            BookingFilter::AcceptedForPlayer(player) => {
                booking.player_id == player && booking.status == CoachBookingStatus::Accepted
            }
        }
    }
}

/// Great-circle distance between two points in meters.
fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

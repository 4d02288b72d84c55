use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{game::TimeWindow, sport::SportRef};

/// Overall lifecycle status of a game; the single source of truth for bookability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum GameStatus {
    /// Accepting join requests.
    Open,
    /// Capacity reached; no further approvals.
    Full,
    /// Played; terminal.
    Completed,
    /// Called off; terminal.
    Cancelled,
    /// Parked by a collaborator until the host intervenes.
    NeedsHostAction,
}

impl GameStatus {
    /// Statuses that still hold players to the game's time window.
    pub fn is_active(self) -> bool {
        matches!(self, GameStatus::Open | GameStatus::Full)
    }
}

/// Venue booking/payment completion flag, owned by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BookingStatus {
    /// Venue paid and confirmed.
    Booked,
    /// Payment not completed yet.
    NotBooked,
}

/// Sub-state of a single user's request to join a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    /// Waiting for the host.
    Pending,
    /// Accepted; the user is on the roster.
    Approved,
    /// Declined; the user cannot ask again.
    Rejected,
}

impl std::fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Status of a 1:1 coaching session booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CoachBookingStatus {
    /// Waiting for the coach.
    Pending,
    /// Confirmed; the slot is booked for this player.
    Accepted,
    /// Declined by the coach.
    Rejected,
}

impl std::fmt::Display for CoachBookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CoachBookingStatus::Pending => "pending",
            CoachBookingStatus::Accepted => "accepted",
            CoachBookingStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Minimum and maximum number of players a game admits (host included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayersNeeded {
    /// Players required for the game to happen.
    pub min: u32,
    /// Hard cap on approved players.
    pub max: u32,
}

/// WGS84 point stored as longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// References into the external venue inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRefEntity {
    /// Venue identifier in the inventory.
    pub venue_id: Option<String>,
    /// City the venue is located in.
    pub city: Option<String>,
    /// Venue coordinates used by geographic search.
    pub location: GeoPoint,
    /// Court or pitch within the venue.
    pub sub_venue_id: Option<String>,
    /// Display name of the sub-venue.
    pub sub_venue_name: Option<String>,
}

/// The booked venue slot a game is played in.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSlotEntity {
    /// Identifier of the external time-slot document the slot was taken from.
    pub time_slot_document_id: Option<String>,
    /// Slot identifier within that document.
    pub slot_id: Option<String>,
    /// Calendar date of the slot.
    pub date: Date,
    /// Inclusive start of the slot.
    pub start_time: OffsetDateTime,
    /// Exclusive end of the slot.
    pub end_time: OffsetDateTime,
    /// Venue price for the slot, when known.
    pub price: Option<f64>,
}

/// One user's request to join a game.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequestEntity {
    /// Requesting user.
    pub user: Uuid,
    /// Current state of the request.
    pub status: JoinRequestStatus,
    /// When the request was filed.
    pub requested_at: OffsetDateTime,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// User who created the game.
    pub host: Uuid,
    /// Sport played.
    pub sport: SportRef,
    /// Free-text description written by the host.
    pub description: String,
    /// Where the game is played.
    pub venue: VenueRefEntity,
    /// When the game is played.
    pub slot: GameSlotEntity,
    /// Capacity bounds.
    pub players_needed: PlayersNeeded,
    /// Users counted against `players_needed.max`; the host is always first.
    pub approved_players: Vec<Uuid>,
    /// Join requests in arrival order, at most one per user.
    pub join_requests: Vec<JoinRequestEntity>,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Venue payment flag.
    pub booking_status: BookingStatus,
    /// Optimistic concurrency stamp, bumped by every persisted mutation.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Timestamp of the last mutation.
    pub updated_at: OffsetDateTime,
}

impl GameEntity {
    /// Time window the game occupies.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.slot.start_time, self.slot.end_time)
    }
}

/// Bookable window published by a coach.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachSlotEntity {
    /// Primary key of the slot.
    pub id: Uuid,
    /// Coach offering the slot.
    pub coach_id: Uuid,
    /// Calendar date of the slot.
    pub date: Date,
    /// Inclusive start of the session.
    pub start_time: OffsetDateTime,
    /// Exclusive end of the session.
    pub end_time: OffsetDateTime,
    /// Set once a booking is accepted; never cleared afterwards.
    pub is_booked: bool,
    /// Player holding the slot.
    pub booked_by: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
}

impl CoachSlotEntity {
    /// Time window the slot occupies.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }
}

/// A player's request for a coach slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachBookingEntity {
    /// Primary key of the booking.
    pub id: Uuid,
    /// Coach owning the requested slot.
    pub coach_id: Uuid,
    /// Player asking for the session.
    pub player_id: Uuid,
    /// Requested slot.
    pub slot_id: Uuid,
    /// Current state of the booking.
    pub status: CoachBookingStatus,
    /// Copied from the slot when the booking was requested.
    pub date: Date,
    /// Session start, copied from the slot.
    pub start_time: OffsetDateTime,
    /// Session end, copied from the slot.
    pub end_time: OffsetDateTime,
    /// Reason given by the coach on rejection.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    /// Timestamp of the last status change.
    pub updated_at: OffsetDateTime,
}

impl CoachBookingEntity {
    /// Time window the booked session occupies.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }
}

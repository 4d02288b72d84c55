use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{CoachBookingEntity, CoachBookingStatus, CoachSlotEntity},
    dto::validation::validate_slot_request,
};

/// Window a coach offers for 1:1 sessions.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_slot_request"))]
pub struct CreateSlotRequest {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// RFC 3339 start.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub start_time: OffsetDateTime,
    /// RFC 3339 end; after `startTime`.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub end_time: OffsetDateTime,
}

/// Filters accepted by the slot listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSlotsQuery {
    /// Only slots of this coach.
    pub coach_id: Option<Uuid>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Only slots nobody booked yet.
    #[serde(default)]
    pub available_only: bool,
}

/// Player request for a coach slot.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookSlotRequest {
    /// Slot being requested.
    pub slot_id: Uuid,
}

/// Optional explanation attached to a rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectBookingRequest {
    /// Shown to the player; a default is used when omitted.
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Which side of the bookings the caller wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingRole {
    /// Bookings the caller made.
    #[default]
    Player,
    /// Bookings on the caller's slots.
    Coach,
}

/// Filters accepted by the booking listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBookingsQuery {
    /// `player` (default) or `coach`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub role: BookingRole,
}

/// Coach slot exposed to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Slot id.
    pub id: Uuid,
    /// Coach who published the slot.
    pub coach_id: Uuid,
    /// Slot date, `YYYY-MM-DD`.
    pub date: String,
    /// Session start.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub start_time: OffsetDateTime,
    /// Session end.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub end_time: OffsetDateTime,
    /// Whether a booking was accepted.
    pub is_booked: bool,
    /// Player holding the slot.
    pub booked_by: Option<Uuid>,
}

impl From<&CoachSlotEntity> for SlotView {
    fn from(slot: &CoachSlotEntity) -> Self {
        Self {
            id: slot.id,
            coach_id: slot.coach_id,
            date: slot.date.to_string(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            is_booked: slot.is_booked,
            booked_by: slot.booked_by,
        }
    }
}

/// Coach booking exposed to clients.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    /// Booking id.
    pub id: Uuid,
    /// Coach owning the slot.
    pub coach_id: Uuid,
    /// Player who asked.
    pub player_id: Uuid,
    /// Requested slot.
    pub slot_id: Uuid,
    /// Lifecycle status.
    pub status: CoachBookingStatus,
    /// Slot date, `YYYY-MM-DD`.
    pub date: String,
    /// Slot start.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub start_time: OffsetDateTime,
    /// Slot end.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub end_time: OffsetDateTime,
    /// Set once the coach rejected.
    pub rejection_reason: Option<String>,
}

impl From<&CoachBookingEntity> for BookingView {
    fn from(booking: &CoachBookingEntity) -> Self {
        Self {
            id: booking.id,
            coach_id: booking.coach_id,
            player_id: booking.player_id,
            slot_id: booking.slot_id,
            status: booking.status,
            date: booking.date.to_string(),
            start_time: booking.start_time,
            end_time: booking.end_time,
            rejection_reason: booking.rejection_reason.clone(),
        }
    }
}

/// Envelope around a single slot.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SlotResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome summary.
    pub message: Option<String>,
    /// The slot.
    pub slot: SlotView,
}

/// Envelope around a slot listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlotListResponse {
    /// Always `true`.
    pub success: bool,
    /// Number of slots.
    pub count: usize,
    /// Matching slots, earliest first.
    pub slots: Vec<SlotView>,
}

/// Envelope around a single booking.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome summary.
    pub message: Option<String>,
    /// The booking.
    pub booking: BookingView,
}

/// Envelope around a booking listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingListResponse {
    /// Always `true`.
    pub success: bool,
    /// Number of bookings.
    pub count: usize,
    /// Matching bookings, oldest first.
    pub bookings: Vec<BookingView>,
}

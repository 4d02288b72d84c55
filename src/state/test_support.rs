use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    dao::models::{
        BookingStatus, CoachBookingEntity, CoachBookingStatus, CoachSlotEntity, GameEntity,
        GameSlotEntity, GameStatus, GeoPoint, PlayersNeeded, VenueRefEntity,
    },
    state::sport::SportRef,
};

/// Open one-hour game hosted by `host`, host pre-approved.
pub fn game_fixture(host: Uuid, start: OffsetDateTime, min: u32, max: u32) -> GameEntity {
    let created = start - Duration::days(1);
    GameEntity {
        id: Uuid::new_v4(),
        host,
        sport: SportRef::Name("Football".into()),
        description: "Five-a-side".into(),
        venue: VenueRefEntity {
            venue_id: Some("venue-1".into()),
            city: Some("Lyon".into()),
            location: GeoPoint {
                lng: 4.8357,
                lat: 45.764,
            },
            sub_venue_id: None,
            sub_venue_name: None,
        },
        slot: GameSlotEntity {
            time_slot_document_id: None,
            slot_id: None,
            date: start.date(),
            start_time: start,
            end_time: start + Duration::hours(1),
            price: Some(30.0),
        },
        players_needed: PlayersNeeded { min, max },
        approved_players: vec![host],
        join_requests: Vec::new(),
        status: GameStatus::Open,
        booking_status: BookingStatus::NotBooked,
        version: 0,
        created_at: created,
        updated_at: created,
    }
}

/// Unbooked one-hour slot for `coach`.
pub fn slot_fixture(coach: Uuid, start: OffsetDateTime) -> CoachSlotEntity {
    CoachSlotEntity {
        id: Uuid::new_v4(),
        coach_id: coach,
        date: start.date(),
        start_time: start,
        end_time: start + Duration::hours(1),
        is_booked: false,
        booked_by: None,
        created_at: start - Duration::days(1),
    }
}

/// Booking of `slot` by `player` in the given status.
pub fn booking_fixture(
    slot: &CoachSlotEntity,
    player: Uuid,
    status: CoachBookingStatus,
) -> CoachBookingEntity {
    CoachBookingEntity {
        id: Uuid::new_v4(),
        coach_id: slot.coach_id,
        player_id: player,
        slot_id: slot.id,
        status,
        date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        rejection_reason: None,
        created_at: slot.created_at,
        updated_at: slot.created_at,
    }
}

//! Coach slot and booking rules.
//!
//! Same shape as the join request rules but with 1:1 cardinality: a slot is
//! booked by exactly one accepted booking.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{CoachBookingEntity, CoachBookingStatus, CoachSlotEntity},
    state::{
        game::TimeWindow,
        state_machine::{CoachBookingEvent, coach_booking_transition},
    },
};

/// Reason recorded when a coach rejects without explanation.
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Business rule violations raised by coach operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoachRuleError {
    /// The slot ends before it starts.
    #[error("slot end time must be after its start time")]
    InvalidWindow,
    /// The coach already offers that exact window.
    #[error("slot already exists for this coach at that time")]
    DuplicateSlot,
    /// Unknown slot.
    #[error("slot `{0}` not found")]
    SlotNotFound(Uuid),
    /// Unknown booking.
    #[error("booking `{0}` not found")]
    BookingNotFound(Uuid),
    /// The slot was booked before the request.
    #[error("slot is already booked")]
    SlotAlreadyBooked,
    /// The slot was claimed by another booking.
    #[error("slot no longer available")]
    SlotUnavailable,
    /// A booked slot cannot be removed.
    #[error("booked slots cannot be deleted")]
    SlotBooked,
    /// The caller does not own the slot.
    #[error("only the owning coach can manage this slot")]
    NotSlotOwner,
    /// The caller is not the booking's coach.
    #[error("only the coach of this booking can manage it")]
    NotBookingCoach,
    /// Coaches cannot book themselves.
    #[error("coaches cannot book their own slots")]
    OwnSlot,
    /// The player already has a live booking on the slot.
    #[error("you already have a {0} booking for this slot")]
    AlreadyRequested(CoachBookingStatus),
    /// The booking was already decided.
    #[error("booking is already {0}")]
    NotPending(CoachBookingStatus),
    /// The session collides with another accepted booking.
    #[error("session overlaps with accepted booking `{0}`")]
    Overlap(Uuid),
}

/// Check a new slot's window.
pub fn validate_slot_window(window: &TimeWindow) -> Result<(), CoachRuleError> {
    if !window.is_well_formed() {
        return Err(CoachRuleError::InvalidWindow);
    }
    Ok(())
}

/// Preconditions for `player` requesting `slot`.
///
/// `own_bookings` are the player's bookings for this slot; `accepted` are all
/// of the player's accepted bookings.
pub fn check_booking_request(
    slot: &CoachSlotEntity,
    player: Uuid,
    own_bookings: &[CoachBookingEntity],
    accepted: &[CoachBookingEntity],
) -> Result<(), CoachRuleError> {
    if slot.is_booked {
        return Err(CoachRuleError::SlotAlreadyBooked);
    }
    if slot.coach_id == player {
        return Err(CoachRuleError::OwnSlot);
    }
    if let Some(existing) = own_bookings.iter().find(|booking| {
        matches!(
            booking.status,
            CoachBookingStatus::Pending | CoachBookingStatus::Accepted
        )
    }) {
        return Err(CoachRuleError::AlreadyRequested(existing.status));
    }
    ensure_no_overlap(&slot.window(), accepted, None)
}

/// Preconditions for `coach` accepting `booking` on `slot` (if the slot still exists).
pub fn check_accept(
    booking: &CoachBookingEntity,
    coach: Uuid,
    slot: Option<&CoachSlotEntity>,
    accepted: &[CoachBookingEntity],
) -> Result<CoachBookingStatus, CoachRuleError> {
    ensure_booking_coach(booking, coach)?;
    let next = coach_booking_transition(booking.status, CoachBookingEvent::Accept)
        .map_err(|invalid| CoachRuleError::NotPending(invalid.from))?;
    match slot {
        Some(slot) if !slot.is_booked => {}
        _ => return Err(CoachRuleError::SlotUnavailable),
    }
    ensure_no_overlap(&booking.window(), accepted, Some(booking.id))?;
    Ok(next)
}

/// Preconditions for `coach` rejecting `booking`.
pub fn check_reject(
    booking: &CoachBookingEntity,
    coach: Uuid,
) -> Result<CoachBookingStatus, CoachRuleError> {
    ensure_booking_coach(booking, coach)?;
    coach_booking_transition(booking.status, CoachBookingEvent::Reject)
        .map_err(|invalid| CoachRuleError::NotPending(invalid.from))
}

/// Preconditions for `coach` deleting `slot`.
pub fn check_delete(slot: &CoachSlotEntity, coach: Uuid) -> Result<(), CoachRuleError> {
    if slot.coach_id != coach {
        return Err(CoachRuleError::NotSlotOwner);
    }
    if slot.is_booked {
        return Err(CoachRuleError::SlotBooked);
    }
    Ok(())
}

/// Trimmed reason, or the default when none was given.
pub fn rejection_reason(reason: Option<String>) -> String {
    reason
        .map(|reason| reason.trim().to_owned())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned())
}

fn ensure_booking_coach(booking: &CoachBookingEntity, coach: Uuid) -> Result<(), CoachRuleError> {
    if booking.coach_id != coach {
        return Err(CoachRuleError::NotBookingCoach);
    }
    Ok(())
}

fn ensure_no_overlap(
    window: &TimeWindow,
    accepted: &[CoachBookingEntity],
    exclude: Option<Uuid>,
) -> Result<(), CoachRuleError> {
    match accepted
        .iter()
        .filter(|booking| Some(booking.id) != exclude)
        .filter(|booking| booking.status == CoachBookingStatus::Accepted)
        .find(|booking| booking.window().overlaps(window))
    {
        Some(conflict) => Err(CoachRuleError::Overlap(conflict.id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};

    use super::*;
    use crate::state::test_support::{booking_fixture, slot_fixture};

    #[test]
    fn booked_slot_cannot_be_requested() {
        let mut slot = slot_fixture(Uuid::new_v4(), datetime!(2026-07-01 08:00 UTC));
        slot.is_booked = true;
        assert_eq!(
            check_booking_request(&slot, Uuid::new_v4(), &[], &[]),
            Err(CoachRuleError::SlotAlreadyBooked)
        );
    }

    #[test]
    fn duplicate_active_request_is_rejected() {
        let slot = slot_fixture(Uuid::new_v4(), datetime!(2026-07-01 08:00 UTC));
        let player = Uuid::new_v4();
        let pending = booking_fixture(&slot, player, CoachBookingStatus::Pending);
        assert_eq!(
            check_booking_request(&slot, player, &[pending], &[]),
            Err(CoachRuleError::AlreadyRequested(CoachBookingStatus::Pending))
        );
    }

    #[test]
    fn rejected_request_does_not_block_a_new_one() {
        let slot = slot_fixture(Uuid::new_v4(), datetime!(2026-07-01 08:00 UTC));
        let player = Uuid::new_v4();
        let rejected = booking_fixture(&slot, player, CoachBookingStatus::Rejected);
        assert!(check_booking_request(&slot, player, &[rejected], &[]).is_ok());
    }

    #[test]
    fn coach_cannot_book_own_slot() {
        let coach = Uuid::new_v4();
        let slot = slot_fixture(coach, datetime!(2026-07-01 08:00 UTC));
        assert_eq!(
            check_booking_request(&slot, coach, &[], &[]),
            Err(CoachRuleError::OwnSlot)
        );
    }

    #[test]
    fn accepted_sessions_cannot_overlap() {
        let start = datetime!(2026-07-01 08:00 UTC);
        let player = Uuid::new_v4();
        let held = slot_fixture(Uuid::new_v4(), start);
        let accepted = booking_fixture(&held, player, CoachBookingStatus::Accepted);
        let clashing = slot_fixture(Uuid::new_v4(), start + Duration::minutes(30));

        assert_eq!(
            check_booking_request(&clashing, player, &[], std::slice::from_ref(&accepted)),
            Err(CoachRuleError::Overlap(accepted.id))
        );
    }

    #[test]
    fn accept_requires_unbooked_slot() {
        let coach = Uuid::new_v4();
        let mut slot = slot_fixture(coach, datetime!(2026-07-01 08:00 UTC));
        let booking = booking_fixture(&slot, Uuid::new_v4(), CoachBookingStatus::Pending);

        assert_eq!(
            check_accept(&booking, coach, Some(&slot), &[]),
            Ok(CoachBookingStatus::Accepted)
        );

        slot.is_booked = true;
        let err = check_accept(&booking, coach, Some(&slot), &[]).unwrap_err();
        assert_eq!(err.to_string(), "slot no longer available");
        assert_eq!(
            check_accept(&booking, coach, None, &[]),
            Err(CoachRuleError::SlotUnavailable)
        );
    }

    #[test]
    fn accept_and_reject_require_the_booking_coach() {
        let slot = slot_fixture(Uuid::new_v4(), datetime!(2026-07-01 08:00 UTC));
        let booking = booking_fixture(&slot, Uuid::new_v4(), CoachBookingStatus::Pending);
        let stranger = Uuid::new_v4();
        assert_eq!(
            check_accept(&booking, stranger, Some(&slot), &[]),
            Err(CoachRuleError::NotBookingCoach)
        );
        assert_eq!(
            check_reject(&booking, stranger),
            Err(CoachRuleError::NotBookingCoach)
        );
    }

    #[test]
    fn settled_bookings_cannot_be_rejected() {
        let coach = Uuid::new_v4();
        let slot = slot_fixture(coach, datetime!(2026-07-01 08:00 UTC));
        let booking = booking_fixture(&slot, Uuid::new_v4(), CoachBookingStatus::Accepted);
        assert_eq!(
            check_reject(&booking, coach),
            Err(CoachRuleError::NotPending(CoachBookingStatus::Accepted))
        );
    }

    #[test]
    fn delete_requires_owner_and_unbooked_slot() {
        let coach = Uuid::new_v4();
        let mut slot = slot_fixture(coach, datetime!(2026-07-01 08:00 UTC));
        assert_eq!(
            check_delete(&slot, Uuid::new_v4()),
            Err(CoachRuleError::NotSlotOwner)
        );
        slot.is_booked = true;
        assert_eq!(check_delete(&slot, coach), Err(CoachRuleError::SlotBooked));
    }

    #[test]
    fn blank_reason_falls_back_to_default() {
        assert_eq!(rejection_reason(None), DEFAULT_REJECTION_REASON);
        assert_eq!(rejection_reason(Some("   ".into())), DEFAULT_REJECTION_REASON);
        assert_eq!(rejection_reason(Some(" busy ".into())), "busy");
    }
}

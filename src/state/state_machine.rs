//! Transition tables for every lifecycle in the booking domain.
//!
//! Each table is a single `match` over `(current, event)`; anything not listed
//! is rejected with [`InvalidTransition`]. Services never assign a status
//! directly, they always go through one of these functions.

use std::fmt;

use crate::dao::models::{CoachBookingStatus, GameStatus, JoinRequestStatus};

/// Events that move a game between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// An approval brought the approved players up to `players_needed.max`.
    CapacityReached,
    /// Host or operator called the game off.
    Cancel,
    /// The game has been played.
    Complete,
    /// An external collaborator needs the host to intervene.
    FlagForHost,
}

/// Events applied to a join request by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRequestEvent {
    /// Host admits the player.
    Approve,
    /// Host turns the player down.
    Reject,
}

/// Events applied to a coach booking by the coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachBookingEvent {
    /// Coach confirms the session.
    Accept,
    /// Coach declines the session.
    Reject,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition<S, E> {
    /// Status the entity was in when the event was received.
    pub from: S,
    /// The event that cannot be applied from this status.
    pub event: E,
}

impl<S: fmt::Debug, E: fmt::Debug> fmt::Display for InvalidTransition<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid transition: {:?} cannot be applied while in {:?}",
            self.event, self.from
        )
    }
}

impl<S: fmt::Debug, E: fmt::Debug> std::error::Error for InvalidTransition<S, E> {}

/// Compute the next game status for `event`.
pub fn game_transition(
    from: GameStatus,
    event: GameEvent,
) -> Result<GameStatus, InvalidTransition<GameStatus, GameEvent>> {
    use GameStatus::*;

    let next = match (from, event) {
        (Open, GameEvent::CapacityReached) => Full,
        (Open | Full | NeedsHostAction, GameEvent::Cancel) => Cancelled,
        (Open | Full | NeedsHostAction, GameEvent::Complete) => Completed,
        (Open | Full, GameEvent::FlagForHost) => NeedsHostAction,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Compute the next join request status for `event`; only pending requests move.
pub fn join_request_transition(
    from: JoinRequestStatus,
    event: JoinRequestEvent,
) -> Result<JoinRequestStatus, InvalidTransition<JoinRequestStatus, JoinRequestEvent>> {
    match (from, event) {
        (JoinRequestStatus::Pending, JoinRequestEvent::Approve) => Ok(JoinRequestStatus::Approved),
        (JoinRequestStatus::Pending, JoinRequestEvent::Reject) => Ok(JoinRequestStatus::Rejected),
        (from, event) => Err(InvalidTransition { from, event }),
    }
}

/// Compute the next coach booking status for `event`; only pending bookings move.
pub fn coach_booking_transition(
    from: CoachBookingStatus,
    event: CoachBookingEvent,
) -> Result<CoachBookingStatus, InvalidTransition<CoachBookingStatus, CoachBookingEvent>> {
    match (from, event) {
        (CoachBookingStatus::Pending, CoachBookingEvent::Accept) => {
            Ok(CoachBookingStatus::Accepted)
        }
        (CoachBookingStatus::Pending, CoachBookingEvent::Reject) => {
            Ok(CoachBookingStatus::Rejected)
        }
        (from, event) => Err(InvalidTransition { from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_game_fills_up() {
        assert_eq!(
            game_transition(GameStatus::Open, GameEvent::CapacityReached),
            Ok(GameStatus::Full)
        );
    }

    #[test]
    fn full_game_cannot_fill_again() {
        let err = game_transition(GameStatus::Full, GameEvent::CapacityReached).unwrap_err();
        assert_eq!(err.from, GameStatus::Full);
        assert_eq!(err.event, GameEvent::CapacityReached);
    }

    #[test]
    fn active_games_can_be_cancelled_or_completed() {
        for from in [GameStatus::Open, GameStatus::Full, GameStatus::NeedsHostAction] {
            assert_eq!(
                game_transition(from, GameEvent::Cancel),
                Ok(GameStatus::Cancelled)
            );
            assert_eq!(
                game_transition(from, GameEvent::Complete),
                Ok(GameStatus::Completed)
            );
        }
    }

    #[test]
    fn terminal_statuses_have_no_exit() {
        let events = [
            GameEvent::CapacityReached,
            GameEvent::Cancel,
            GameEvent::Complete,
            GameEvent::FlagForHost,
        ];
        for from in [GameStatus::Cancelled, GameStatus::Completed] {
            for event in events {
                assert!(
                    game_transition(from, event).is_err(),
                    "{event:?} escaped {from:?}"
                );
            }
        }
    }

    #[test]
    fn host_action_flag_is_not_open() {
        assert_eq!(
            game_transition(GameStatus::Open, GameEvent::FlagForHost),
            Ok(GameStatus::NeedsHostAction)
        );
        assert!(game_transition(GameStatus::NeedsHostAction, GameEvent::CapacityReached).is_err());
    }

    #[test]
    fn only_pending_join_requests_move() {
        assert_eq!(
            join_request_transition(JoinRequestStatus::Pending, JoinRequestEvent::Approve),
            Ok(JoinRequestStatus::Approved)
        );
        assert_eq!(
            join_request_transition(JoinRequestStatus::Pending, JoinRequestEvent::Reject),
            Ok(JoinRequestStatus::Rejected)
        );
        for from in [JoinRequestStatus::Approved, JoinRequestStatus::Rejected] {
            for event in [JoinRequestEvent::Approve, JoinRequestEvent::Reject] {
                assert!(join_request_transition(from, event).is_err());
            }
        }
    }

    #[test]
    fn only_pending_coach_bookings_move() {
        assert_eq!(
            coach_booking_transition(CoachBookingStatus::Pending, CoachBookingEvent::Accept),
            Ok(CoachBookingStatus::Accepted)
        );
        let err = coach_booking_transition(CoachBookingStatus::Rejected, CoachBookingEvent::Accept)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition: Accept cannot be applied while in Rejected"
        );
    }
}

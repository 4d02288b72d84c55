//! Join request sub-state-machine for a single game.
//!
//! Every operation checks its preconditions in a fixed order and only mutates
//! the game once all of them hold, so a failed call leaves the game untouched.
//! Overlap checks take the caller-supplied list of games in which the subject
//! user is already approved.

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GameStatus, JoinRequestEntity, JoinRequestStatus},
    state::{
        game::{find_overlap, has_room, has_started, is_at_capacity},
        state_machine::{GameEvent, JoinRequestEvent, game_transition, join_request_transition},
    },
};

/// Business rule violations raised by join request operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRuleError {
    /// The requester hosts the game.
    #[error("host cannot join own game")]
    HostCannotJoin,
    /// The caller is not the host.
    #[error("only the host can manage join requests")]
    NotHost,
    /// The game no longer accepts requests.
    #[error("game is not open for join requests")]
    NotOpenForJoin,
    /// The game left `Open` before the host acted.
    #[error("game is not open (status {0:?})")]
    NotOpen(GameStatus),
    /// The game start time has passed.
    #[error("game has already started")]
    AlreadyStarted,
    /// The requester already has a pending request.
    #[error("join request already pending")]
    AlreadyPending,
    /// The requester is already on the roster.
    #[error("already approved for this game")]
    AlreadyApproved,
    /// The host rejected this requester before.
    #[error("join request was rejected previously")]
    PreviouslyRejected,
    /// The user has no request on this game.
    #[error("no join request found for user `{0}`")]
    RequestNotFound(Uuid),
    /// The request was already decided.
    #[error("join request is already {0}")]
    NotPending(JoinRequestStatus),
    /// The roster reached capacity.
    #[error("game already full")]
    GameFull,
    /// The user is committed to another game at that time.
    #[error("time slot overlaps with game `{0}`")]
    Overlap(Uuid),
    /// Only pending or approved requests can be withdrawn.
    #[error("cannot cancel {0} request")]
    CannotCancel(JoinRequestStatus),
    /// Withdrawal came too close to the start.
    #[error("join requests can only be cancelled at least {minutes} minutes before the game starts")]
    CancellationCutoff {
        /// Configured cutoff before start.
        minutes: i64,
    },
}

/// Result of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval {
    /// Roster size after approval.
    pub approved_count: usize,
    /// Game status after approval.
    pub status: GameStatus,
}

/// File a pending join request for `requester`.
pub fn create(
    game: &mut GameEntity,
    requester: Uuid,
    now: OffsetDateTime,
    requester_games: &[GameEntity],
) -> Result<(), JoinRuleError> {
    if game.host == requester {
        return Err(JoinRuleError::HostCannotJoin);
    }
    if game.status != GameStatus::Open {
        return Err(JoinRuleError::NotOpenForJoin);
    }
    if has_started(game, now) {
        return Err(JoinRuleError::AlreadyStarted);
    }
    if let Some(existing) = find_request(game, requester) {
        return Err(match existing.status {
            JoinRequestStatus::Pending => JoinRuleError::AlreadyPending,
            JoinRequestStatus::Approved => JoinRuleError::AlreadyApproved,
            JoinRequestStatus::Rejected => JoinRuleError::PreviouslyRejected,
        });
    }
    if let Some(conflict) = find_overlap(&game.window(), other_games(game, requester_games)) {
        return Err(JoinRuleError::Overlap(conflict.id));
    }

    game.join_requests.push(JoinRequestEntity {
        user: requester,
        status: JoinRequestStatus::Pending,
        requested_at: now,
    });
    game.updated_at = now;
    Ok(())
}

/// Approve `player`'s pending request, filling the game when capacity is reached.
///
/// Capacity is checked before overlap.
pub fn approve(
    game: &mut GameEntity,
    player: Uuid,
    caller: Uuid,
    now: OffsetDateTime,
    player_games: &[GameEntity],
) -> Result<Approval, JoinRuleError> {
    ensure_host(game, caller)?;
    ensure_open(game)?;
    if has_started(game, now) {
        return Err(JoinRuleError::AlreadyStarted);
    }
    let index = request_index(game, player)?;
    let next = join_request_transition(game.join_requests[index].status, JoinRequestEvent::Approve)
        .map_err(|invalid| JoinRuleError::NotPending(invalid.from))?;
    if !has_room(game) {
        return Err(JoinRuleError::GameFull);
    }
    if let Some(conflict) = find_overlap(&game.window(), other_games(game, player_games)) {
        return Err(JoinRuleError::Overlap(conflict.id));
    }

    game.join_requests[index].status = next;
    if !game.approved_players.contains(&player) {
        game.approved_players.push(player);
    }
    if is_at_capacity(game) {
        // Open is guaranteed above, so the table accepts the event.
        if let Ok(full) = game_transition(game.status, GameEvent::CapacityReached) {
            game.status = full;
        }
    }
    game.updated_at = now;

    Ok(Approval {
        approved_count: game.approved_players.len(),
        status: game.status,
    })
}

/// Reject `player`'s pending request. Rejection is terminal for this game.
pub fn reject(
    game: &mut GameEntity,
    player: Uuid,
    caller: Uuid,
    now: OffsetDateTime,
) -> Result<(), JoinRuleError> {
    ensure_host(game, caller)?;
    ensure_open(game)?;
    let index = request_index(game, player)?;
    let next = join_request_transition(game.join_requests[index].status, JoinRequestEvent::Reject)
        .map_err(|invalid| JoinRuleError::NotPending(invalid.from))?;

    game.join_requests[index].status = next;
    game.updated_at = now;
    Ok(())
}

/// Withdraw the requester's own pending request. The entry is removed, so the
/// user may request again later.
pub fn cancel(
    game: &mut GameEntity,
    requester: Uuid,
    now: OffsetDateTime,
    cutoff: Duration,
) -> Result<(), JoinRuleError> {
    let index = request_index(game, requester)?;
    let status = game.join_requests[index].status;
    if status != JoinRequestStatus::Pending {
        return Err(JoinRuleError::CannotCancel(status));
    }
    if game.slot.start_time - now < cutoff {
        return Err(JoinRuleError::CancellationCutoff {
            minutes: cutoff.whole_minutes(),
        });
    }

    game.join_requests.remove(index);
    game.updated_at = now;
    Ok(())
}

/// The join request filed by `user`, if any.
pub fn find_request(game: &GameEntity, user: Uuid) -> Option<&JoinRequestEntity> {
    game.join_requests.iter().find(|request| request.user == user)
}

/// The user's games minus `game` itself, which holds them once they are approved.
fn other_games<'a>(
    game: &GameEntity,
    user_games: &'a [GameEntity],
) -> impl Iterator<Item = &'a GameEntity> + use<'a> {
    let id = game.id;
    user_games.iter().filter(move |other| other.id != id)
}

fn request_index(game: &GameEntity, user: Uuid) -> Result<usize, JoinRuleError> {
    game.join_requests
        .iter()
        .position(|request| request.user == user)
        .ok_or(JoinRuleError::RequestNotFound(user))
}

fn ensure_host(game: &GameEntity, caller: Uuid) -> Result<(), JoinRuleError> {
    if game.host != caller {
        return Err(JoinRuleError::NotHost);
    }
    Ok(())
}

fn ensure_open(game: &GameEntity) -> Result<(), JoinRuleError> {
    if game.status != GameStatus::Open {
        return Err(JoinRuleError::NotOpen(game.status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::state::test_support::game_fixture;

    const START: OffsetDateTime = datetime!(2026-06-01 18:00 UTC);
    const BEFORE: OffsetDateTime = datetime!(2026-06-01 09:00 UTC);

    fn open_game(min: u32, max: u32) -> (GameEntity, Uuid) {
        let host = Uuid::new_v4();
        (game_fixture(host, START, min, max), host)
    }

    #[test]
    fn create_appends_pending_request() {
        let (mut game, _) = open_game(2, 4);
        let player = Uuid::new_v4();

        create(&mut game, player, BEFORE, &[]).unwrap();

        let request = find_request(&game, player).unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);
        assert_eq!(request.requested_at, BEFORE);
        assert_eq!(game.status, GameStatus::Open);
    }

    #[test]
    fn host_cannot_join_own_game() {
        let (mut game, host) = open_game(2, 4);
        assert_eq!(
            create(&mut game, host, BEFORE, &[]),
            Err(JoinRuleError::HostCannotJoin)
        );
    }

    #[test]
    fn create_rejects_started_game() {
        let (mut game, _) = open_game(2, 4);
        assert_eq!(
            create(&mut game, Uuid::new_v4(), START, &[]),
            Err(JoinRuleError::AlreadyStarted)
        );
    }

    #[test]
    fn duplicate_requests_report_existing_status() {
        let (mut game, host) = open_game(2, 4);
        let pending = Uuid::new_v4();
        let approved = Uuid::new_v4();
        let rejected = Uuid::new_v4();
        for player in [pending, approved, rejected] {
            create(&mut game, player, BEFORE, &[]).unwrap();
        }
        approve(&mut game, approved, host, BEFORE, &[]).unwrap();
        reject(&mut game, rejected, host, BEFORE).unwrap();

        assert_eq!(
            create(&mut game, pending, BEFORE, &[]),
            Err(JoinRuleError::AlreadyPending)
        );
        assert_eq!(
            create(&mut game, approved, BEFORE, &[]),
            Err(JoinRuleError::AlreadyApproved)
        );
        assert_eq!(
            create(&mut game, rejected, BEFORE, &[]),
            Err(JoinRuleError::PreviouslyRejected)
        );
    }

    #[test]
    fn create_rejects_overlapping_commitment() {
        let (mut game, _) = open_game(2, 4);
        let player = Uuid::new_v4();
        let other = game_fixture(Uuid::new_v4(), START + Duration::minutes(30), 2, 4);

        assert_eq!(
            create(&mut game, player, BEFORE, std::slice::from_ref(&other)),
            Err(JoinRuleError::Overlap(other.id))
        );
        assert!(game.join_requests.is_empty());
    }

    #[test]
    fn approvals_fill_the_game() {
        let (mut game, host) = open_game(2, 3);
        let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        create(&mut game, p1, BEFORE, &[]).unwrap();
        create(&mut game, p2, BEFORE, &[]).unwrap();

        let first = approve(&mut game, p1, host, BEFORE, &[]).unwrap();
        assert_eq!(first.approved_count, 2);
        assert_eq!(first.status, GameStatus::Open);

        let second = approve(&mut game, p2, host, BEFORE, &[]).unwrap();
        assert_eq!(second.approved_count, 3);
        assert_eq!(second.status, GameStatus::Full);

        assert_eq!(
            create(&mut game, p3, BEFORE, &[]),
            Err(JoinRuleError::NotOpenForJoin)
        );
        assert_eq!(
            JoinRuleError::NotOpenForJoin.to_string(),
            "game is not open for join requests"
        );
    }

    #[test]
    fn approve_requires_host() {
        let (mut game, _) = open_game(2, 3);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();
        assert_eq!(
            approve(&mut game, player, player, BEFORE, &[]),
            Err(JoinRuleError::NotHost)
        );
    }

    #[test]
    fn approve_checks_capacity_before_overlap() {
        let (mut game, host) = open_game(2, 2);
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        create(&mut game, p1, BEFORE, &[]).unwrap();
        create(&mut game, p2, BEFORE, &[]).unwrap();
        // Reopen artificially so capacity is the failing guard.
        game.approved_players.push(Uuid::new_v4());
        let clash = game_fixture(Uuid::new_v4(), START, 2, 4);

        assert_eq!(
            approve(&mut game, p1, host, BEFORE, std::slice::from_ref(&clash)),
            Err(JoinRuleError::GameFull)
        );
    }

    #[test]
    fn approve_rechecks_overlap() {
        let (mut game, host) = open_game(2, 4);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();
        let clash = game_fixture(Uuid::new_v4(), START - Duration::minutes(30), 2, 4);

        assert_eq!(
            approve(&mut game, player, host, BEFORE, std::slice::from_ref(&clash)),
            Err(JoinRuleError::Overlap(clash.id))
        );
        assert_eq!(game.approved_players.len(), 1);
        assert_eq!(
            find_request(&game, player).map(|r| r.status),
            Some(JoinRequestStatus::Pending)
        );
    }

    #[test]
    fn approve_does_not_duplicate_approved_player() {
        let (mut game, host) = open_game(2, 4);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();
        game.approved_players.push(player);

        let player_games = vec![game.clone()];

        let approval = approve(&mut game, player, host, BEFORE, &player_games).unwrap();
        assert_eq!(approval.approved_count, 2);
    }

    #[test]
    fn rejecting_twice_is_a_conflict() {
        let (mut game, host) = open_game(2, 4);
        let (rejected, approved) = (Uuid::new_v4(), Uuid::new_v4());
        create(&mut game, rejected, BEFORE, &[]).unwrap();
        create(&mut game, approved, BEFORE, &[]).unwrap();
        reject(&mut game, rejected, host, BEFORE).unwrap();
        approve(&mut game, approved, host, BEFORE, &[]).unwrap();

        assert_eq!(
            reject(&mut game, rejected, host, BEFORE),
            Err(JoinRuleError::NotPending(JoinRequestStatus::Rejected))
        );
        assert_eq!(
            reject(&mut game, approved, host, BEFORE),
            Err(JoinRuleError::NotPending(JoinRequestStatus::Approved))
        );
    }

    #[test]
    fn reject_unknown_request_is_not_found() {
        let (mut game, host) = open_game(2, 4);
        let stranger = Uuid::new_v4();
        assert_eq!(
            reject(&mut game, stranger, host, BEFORE),
            Err(JoinRuleError::RequestNotFound(stranger))
        );
    }

    #[test]
    fn cancel_cutoff_is_inclusive() {
        let cutoff = Duration::hours(2);
        let (mut game, _) = open_game(2, 4);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();

        let just_late = START - Duration::hours(2) + Duration::seconds(1);
        assert_eq!(
            cancel(&mut game, player, just_late, cutoff),
            Err(JoinRuleError::CancellationCutoff { minutes: 120 })
        );

        cancel(&mut game, player, START - Duration::hours(2), cutoff).unwrap();
        assert!(find_request(&game, player).is_none());
    }

    #[test]
    fn cancelled_request_can_be_filed_again() {
        let (mut game, _) = open_game(2, 4);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();
        cancel(&mut game, player, BEFORE, Duration::hours(2)).unwrap();
        create(&mut game, player, BEFORE, &[]).unwrap();
        assert_eq!(game.join_requests.len(), 1);
    }

    #[test]
    fn only_pending_requests_can_be_cancelled() {
        let (mut game, host) = open_game(2, 4);
        let player = Uuid::new_v4();
        create(&mut game, player, BEFORE, &[]).unwrap();
        approve(&mut game, player, host, BEFORE, &[]).unwrap();

        let err = cancel(&mut game, player, BEFORE, Duration::hours(2)).unwrap_err();
        assert_eq!(err.to_string(), "cannot cancel approved request");
    }
}

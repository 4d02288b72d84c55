//! Time windows and the two guards every booking decision goes through.

use time::OffsetDateTime;

use crate::{
    dao::models::{GameEntity, GameStatus},
    state::state_machine::{GameEvent, InvalidTransition, game_transition},
};

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start.
    pub start: OffsetDateTime,
    /// Exclusive end.
    pub end: OffsetDateTime,
}

impl TimeWindow {
    /// Window from `start` to `end`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { start, end }
    }

    /// Whether the two intervals share at least one instant. Touching edges do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether `start` precedes `end`.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }
}

/// Capacity guard: can one more player be approved.
pub fn has_room(game: &GameEntity) -> bool {
    (game.approved_players.len() as u64) < u64::from(game.players_needed.max)
}

/// Whether the approved players reached `players_needed.max`.
pub fn is_at_capacity(game: &GameEntity) -> bool {
    !has_room(game)
}

/// Overlap guard: first active game in `games` whose window intersects `candidate`.
///
/// `games` are the games in which the user is approved; inactive ones are ignored.
pub fn find_overlap<'a, I>(candidate: &TimeWindow, games: I) -> Option<&'a GameEntity>
where
    I: IntoIterator<Item = &'a GameEntity>,
{
    games
        .into_iter()
        .filter(|game| game.status.is_active())
        .find(|game| game.window().overlaps(candidate))
}

/// Whether the game's slot already began at `now`.
pub fn has_started(game: &GameEntity, now: OffsetDateTime) -> bool {
    now >= game.slot.start_time
}

/// Apply a lifecycle event to the game through the transition table.
pub fn apply_game_event(
    game: &mut GameEntity,
    event: GameEvent,
    now: OffsetDateTime,
) -> Result<(), InvalidTransition<GameStatus, GameEvent>> {
    game.status = game_transition(game.status, event)?;
    game.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};
    use uuid::Uuid;

    use super::*;
    use crate::state::test_support::game_fixture;

    #[test]
    fn touching_windows_do_not_overlap() {
        let a = TimeWindow::new(datetime!(2026-05-01 10:00 UTC), datetime!(2026-05-01 11:00 UTC));
        let b = TimeWindow::new(datetime!(2026-05-01 11:00 UTC), datetime!(2026-05-01 12:00 UTC));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn nested_and_partial_windows_overlap() {
        let outer = TimeWindow::new(datetime!(2026-05-01 10:00 UTC), datetime!(2026-05-01 13:00 UTC));
        let inner = TimeWindow::new(datetime!(2026-05-01 11:00 UTC), datetime!(2026-05-01 12:00 UTC));
        let partial =
            TimeWindow::new(datetime!(2026-05-01 12:30 UTC), datetime!(2026-05-01 14:00 UTC));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&partial));
    }

    #[test]
    fn capacity_counts_the_host() {
        let host = Uuid::new_v4();
        let mut game = game_fixture(host, datetime!(2026-05-01 10:00 UTC), 2, 2);
        assert!(has_room(&game));
        game.approved_players.push(Uuid::new_v4());
        assert!(!has_room(&game));
        assert!(is_at_capacity(&game));
    }

    #[test]
    fn overlap_ignores_inactive_games() {
        let host = Uuid::new_v4();
        let start = datetime!(2026-05-01 10:00 UTC);
        let mut cancelled = game_fixture(host, start, 2, 4);
        cancelled.status = GameStatus::Cancelled;
        let active = game_fixture(host, start + Duration::hours(3), 2, 4);
        let games = vec![cancelled, active.clone()];

        let candidate = TimeWindow::new(start, start + Duration::minutes(30));
        assert!(find_overlap(&candidate, &games).is_none());

        let later = TimeWindow::new(start + Duration::hours(3), start + Duration::hours(4));
        assert_eq!(find_overlap(&later, &games).map(|g| g.id), Some(active.id));
    }
}

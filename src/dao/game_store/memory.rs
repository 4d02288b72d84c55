//! Process-local store used by tests and by `STORAGE_BACKEND=memory`.
//!
//! Every conditional write runs under the DashMap shard lock of the entry it
//! touches, which gives the same compare-and-set semantics as the MongoDB
//! filters.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::dao::{
    game_store::{
        BookingFilter, BookingTransition, CoachStore, GameFilter, GameStore, SlotFilter, Stores,
    },
    models::{CoachBookingEntity, CoachSlotEntity, GameEntity},
    storage::{StorageError, StorageResult},
};

type SlotKey = (Uuid, Date, OffsetDateTime, OffsetDateTime);

/// Process-local store over concurrent maps; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameEntity>,
    slots: DashMap<Uuid, CoachSlotEntity>,
    slot_keys: DashMap<SlotKey, Uuid>,
    bookings: DashMap<Uuid, CoachBookingEntity>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Both store handles backed by this instance.
    pub fn stores(&self) -> Stores {
        Stores {
            games: Arc::new(self.clone()),
            coaching: Arc::new(self.clone()),
        }
    }
}

fn slot_key(slot: &CoachSlotEntity) -> SlotKey {
    (slot.coach_id, slot.date, slot.start_time, slot.end_time)
}

impl MemoryInner {
    fn insert_game(&self, game: GameEntity) -> StorageResult<()> {
        match self.games.entry(game.id) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                message: format!("game `{}` already exists", game.id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(game);
                Ok(())
            }
        }
    }

    fn replace_game(&self, mut game: GameEntity) -> StorageResult<GameEntity> {
        let conflict = StorageError::VersionConflict {
            id: game.id,
            expected: game.version,
        };
        let Some(mut stored) = self.games.get_mut(&game.id) else {
            return Err(conflict);
        };
        if stored.version != game.version {
            return Err(conflict);
        }
        game.version += 1;
        *stored = game.clone();
        Ok(game)
    }

    fn list_open_games(&self, filter: &GameFilter) -> Vec<GameEntity> {
        let mut games: Vec<GameEntity> = self
            .games
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by_key(|game| game.slot.start_time);
        games
    }

    fn find_active_games_for_user(&self, user: Uuid) -> Vec<GameEntity> {
        self.games
            .iter()
            .filter(|entry| entry.status.is_active() && entry.approved_players.contains(&user))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn insert_slot(&self, slot: CoachSlotEntity) -> StorageResult<()> {
        match self.slot_keys.entry(slot_key(&slot)) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                message: "slot already exists for this coach at that time".into(),
            }),
            Entry::Vacant(key) => {
                key.insert(slot.id);
                self.slots.insert(slot.id, slot);
                Ok(())
            }
        }
    }

    fn list_slots(&self, filter: &SlotFilter) -> Vec<CoachSlotEntity> {
        let mut slots: Vec<CoachSlotEntity> = self
            .slots
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        slots.sort_by_key(|slot| slot.start_time);
        slots
    }

    fn delete_unbooked_slot(&self, id: Uuid) -> bool {
        match self.slots.remove_if(&id, |_, slot| !slot.is_booked) {
            Some((_, slot)) => {
                self.slot_keys.remove(&slot_key(&slot));
                true
            }
            None => false,
        }
    }

    fn claim_slot(&self, id: Uuid, player: Uuid) -> bool {
        match self.slots.get_mut(&id) {
            Some(mut slot) if !slot.is_booked => {
                slot.is_booked = true;
                slot.booked_by = Some(player);
                true
            }
            _ => false,
        }
    }

    fn release_slot(&self, id: Uuid, player: Uuid) -> bool {
        match self.slots.get_mut(&id) {
            Some(mut slot) if slot.is_booked && slot.booked_by == Some(player) => {
                slot.is_booked = false;
                slot.booked_by = None;
                true
            }
            _ => false,
        }
    }

    fn list_bookings(&self, filter: BookingFilter) -> Vec<CoachBookingEntity> {
        let mut bookings: Vec<CoachBookingEntity> = self
            .bookings
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by_key(|booking| booking.created_at);
        bookings
    }

    fn transition_booking(&self, id: Uuid, transition: BookingTransition) -> bool {
        match self.bookings.get_mut(&id) {
            Some(mut booking) if booking.status == transition.from => {
                booking.status = transition.to;
                if transition.rejection_reason.is_some() {
                    booking.rejection_reason = transition.rejection_reason;
                }
                booking.updated_at = transition.at;
                true
            }
            _ => false,
        }
    }
}

impl GameStore for MemoryStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert_game(game) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|game| game.clone())) })
    }

    fn replace_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.replace_game(game) })
    }

    fn list_open_games(
        &self,
        filter: GameFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.list_open_games(&filter)) })
    }

    fn find_active_games_for_user(
        &self,
        user: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.find_active_games_for_user(user)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

impl CoachStore for MemoryStore {
    fn insert_slot(&self, slot: CoachSlotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert_slot(slot) })
    }

    fn find_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CoachSlotEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.slots.get(&id).map(|slot| slot.clone())) })
    }

    fn list_slots(
        &self,
        filter: SlotFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachSlotEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.list_slots(&filter)) })
    }

    fn delete_unbooked_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.delete_unbooked_slot(id)) })
    }

    fn claim_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.claim_slot(id, player)) })
    }

    fn release_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.release_slot(id, player)) })
    }

    fn insert_booking(&self, booking: CoachBookingEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.bookings.insert(booking.id, booking);
            Ok(())
        })
    }

    fn find_booking(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CoachBookingEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.bookings.get(&id).map(|booking| booking.clone())) })
    }

    fn list_bookings(
        &self,
        filter: BookingFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachBookingEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.list_bookings(filter)) })
    }

    fn transition_booking(
        &self,
        id: Uuid,
        transition: BookingTransition,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.transition_booking(id, transition)) })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::{
        dao::models::CoachBookingStatus,
        state::test_support::{booking_fixture, game_fixture, slot_fixture},
    };

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let game = game_fixture(Uuid::new_v4(), datetime!(2026-05-01 10:00 UTC), 2, 4);
        store.insert_game(game.clone()).await.unwrap();

        let saved = store.replace_game(game.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        let err = store.replace_game(game).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict { expected: 0, .. }
        ));
    }

    #[tokio::test]
    async fn slot_tuple_is_unique_until_deleted() {
        let store = MemoryStore::new();
        let coach = Uuid::new_v4();
        let slot = slot_fixture(coach, datetime!(2026-05-01 10:00 UTC));
        let mut twin = slot.clone();
        twin.id = Uuid::new_v4();

        store.insert_slot(slot.clone()).await.unwrap();
        assert!(matches!(
            store.insert_slot(twin.clone()).await,
            Err(StorageError::Duplicate { .. })
        ));

        assert!(store.delete_unbooked_slot(slot.id).await.unwrap());
        store.insert_slot(twin).await.unwrap();
    }

    #[tokio::test]
    async fn slot_is_claimed_once() {
        let store = MemoryStore::new();
        let slot = slot_fixture(Uuid::new_v4(), datetime!(2026-05-01 10:00 UTC));
        store.insert_slot(slot.clone()).await.unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.claim_slot(slot.id, a).await.unwrap());
        assert!(!store.claim_slot(slot.id, b).await.unwrap());
        assert!(!store.delete_unbooked_slot(slot.id).await.unwrap());
        assert!(!store.release_slot(slot.id, b).await.unwrap());
        assert!(store.release_slot(slot.id, a).await.unwrap());
    }

    #[tokio::test]
    async fn booking_transition_is_conditional() {
        let store = MemoryStore::new();
        let slot = slot_fixture(Uuid::new_v4(), datetime!(2026-05-01 10:00 UTC));
        let booking = booking_fixture(&slot, Uuid::new_v4(), CoachBookingStatus::Pending);
        store.insert_booking(booking.clone()).await.unwrap();
        let at = datetime!(2026-04-30 10:00 UTC);

        let accept = BookingTransition {
            from: CoachBookingStatus::Pending,
            to: CoachBookingStatus::Accepted,
            rejection_reason: None,
            at,
        };
        assert!(store.transition_booking(booking.id, accept.clone()).await.unwrap());
        assert!(!store.transition_booking(booking.id, accept).await.unwrap());

        let stored = store.find_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CoachBookingStatus::Accepted);
        assert_eq!(stored.updated_at, at);
    }
}

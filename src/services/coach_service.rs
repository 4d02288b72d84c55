use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{BookingFilter, BookingTransition, SlotFilter, Stores},
        models::{CoachBookingEntity, CoachBookingStatus, CoachSlotEntity},
        storage::StorageError,
    },
    dto::{
        coach::{BookingRole, BookingView, CreateSlotRequest, ListSlotsQuery, SlotView},
        validation::parse_date,
    },
    error::ServiceError,
    state::{
        SharedState,
        coach::{self, CoachRuleError},
        game::TimeWindow,
    },
};

/// Publish a bookable window for `coach_id`.
pub async fn create_slot(
    state: &SharedState,
    coach_id: Uuid,
    request: CreateSlotRequest,
) -> Result<SlotView, ServiceError> {
    let window = TimeWindow::new(request.start_time, request.end_time);
    coach::validate_slot_window(&window)?;
    let date = parse_date(&request.date).map_err(|_| {
        ServiceError::Validation(format!("`{}` is not a YYYY-MM-DD date", request.date))
    })?;

    let stores = state.require_stores().await?;
    let slot = CoachSlotEntity {
        id: Uuid::new_v4(),
        coach_id,
        date,
        start_time: window.start,
        end_time: window.end,
        is_booked: false,
        booked_by: None,
        created_at: state.now(),
    };

    match stores.coaching.insert_slot(slot.clone()).await {
        Ok(()) => {}
        Err(StorageError::Duplicate { .. }) => return Err(CoachRuleError::DuplicateSlot.into()),
        Err(err) => return Err(err.into()),
    }
    info!(slot_id = %slot.id, coach_id = %coach_id, "coach slot created");
    Ok(SlotView::from(&slot))
}

/// Slots matching the query, earliest first.
pub async fn list_slots(
    state: &SharedState,
    query: ListSlotsQuery,
) -> Result<Vec<SlotView>, ServiceError> {
    let date = query
        .date
        .as_deref()
        .map(|value| {
            parse_date(value)
                .map_err(|_| ServiceError::Validation(format!("`{value}` is not a YYYY-MM-DD date")))
        })
        .transpose()?;
    let filter = SlotFilter {
        coach_id: query.coach_id,
        date,
        available_only: query.available_only,
    };

    let stores = state.require_stores().await?;
    let slots = stores.coaching.list_slots(filter).await?;
    Ok(slots.iter().map(SlotView::from).collect())
}

/// Remove an unbooked slot. Owner only.
pub async fn delete_slot(
    state: &SharedState,
    slot_id: Uuid,
    coach_id: Uuid,
) -> Result<(), ServiceError> {
    let stores = state.require_stores().await?;
    let slot = load_slot(&stores, slot_id).await?;
    coach::check_delete(&slot, coach_id)?;

    if !stores.coaching.delete_unbooked_slot(slot_id).await? {
        // Booked between the read and the delete.
        return Err(CoachRuleError::SlotBooked.into());
    }
    info!(slot_id = %slot_id, coach_id = %coach_id, "coach slot deleted");
    Ok(())
}

/// Ask for a coach slot. The booking stays pending until the coach answers.
pub async fn request_booking(
    state: &SharedState,
    player_id: Uuid,
    slot_id: Uuid,
) -> Result<BookingView, ServiceError> {
    let stores = state.require_stores().await?;
    let slot = load_slot(&stores, slot_id).await?;

    let _guard = state.user_locks().lock(player_id).await;
    let own = stores
        .coaching
        .list_bookings(BookingFilter::PlayerSlot {
            player: player_id,
            slot: slot_id,
        })
        .await?;
    let accepted = stores
        .coaching
        .list_bookings(BookingFilter::AcceptedForPlayer(player_id))
        .await?;
    coach::check_booking_request(&slot, player_id, &own, &accepted)?;

    let now = state.now();
    let booking = CoachBookingEntity {
        id: Uuid::new_v4(),
        coach_id: slot.coach_id,
        player_id,
        slot_id,
        status: CoachBookingStatus::Pending,
        date: slot.date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    };
    stores.coaching.insert_booking(booking.clone()).await?;
    info!(booking_id = %booking.id, slot_id = %slot_id, player_id = %player_id, "coach booking requested");
    Ok(BookingView::from(&booking))
}

/// Accept a pending booking: the slot is claimed first, then the booking moves
/// to accepted. A lost booking transition releases the claim.
pub async fn accept_booking(
    state: &SharedState,
    booking_id: Uuid,
    coach_id: Uuid,
) -> Result<BookingView, ServiceError> {
    let stores = state.require_stores().await?;
    let booking = load_booking(&stores, booking_id).await?;

    let _guard = state.user_locks().lock(booking.player_id).await;
    let slot = stores.coaching.find_slot(booking.slot_id).await?;
    let accepted = stores
        .coaching
        .list_bookings(BookingFilter::AcceptedForPlayer(booking.player_id))
        .await?;
    let next = coach::check_accept(&booking, coach_id, slot.as_ref(), &accepted)?;

    if !stores
        .coaching
        .claim_slot(booking.slot_id, booking.player_id)
        .await?
    {
        return Err(CoachRuleError::SlotUnavailable.into());
    }

    let transition = BookingTransition {
        from: CoachBookingStatus::Pending,
        to: next,
        rejection_reason: None,
        at: state.now(),
    };
    if !stores.coaching.transition_booking(booking_id, transition).await? {
        match stores
            .coaching
            .release_slot(booking.slot_id, booking.player_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(slot_id = %booking.slot_id, booking_id = %booking_id, "slot claim was already released");
            }
            Err(err) => {
                error!(
                    slot_id = %booking.slot_id,
                    booking_id = %booking_id,
                    player_id = %booking.player_id,
                    error = %err,
                    "failed to release slot claim; slot stays booked without an accepted booking"
                );
                return Err(err.into());
            }
        }
        return Err(no_longer_pending(&stores, booking_id).await);
    }

    let booking = load_booking(&stores, booking_id).await?;
    info!(booking_id = %booking_id, slot_id = %booking.slot_id, "coach booking accepted");
    Ok(BookingView::from(&booking))
}

/// Reject a pending booking with an optional reason.
pub async fn reject_booking(
    state: &SharedState,
    booking_id: Uuid,
    coach_id: Uuid,
    reason: Option<String>,
) -> Result<BookingView, ServiceError> {
    let stores = state.require_stores().await?;
    let booking = load_booking(&stores, booking_id).await?;
    let next = coach::check_reject(&booking, coach_id)?;

    let transition = BookingTransition {
        from: CoachBookingStatus::Pending,
        to: next,
        rejection_reason: Some(coach::rejection_reason(reason)),
        at: state.now(),
    };
    if !stores.coaching.transition_booking(booking_id, transition).await? {
        return Err(no_longer_pending(&stores, booking_id).await);
    }

    let booking = load_booking(&stores, booking_id).await?;
    info!(booking_id = %booking_id, "coach booking rejected");
    Ok(BookingView::from(&booking))
}

/// Bookings where the caller is the player or the coach.
pub async fn list_bookings(
    state: &SharedState,
    caller: Uuid,
    role: BookingRole,
) -> Result<Vec<BookingView>, ServiceError> {
    let filter = match role {
        BookingRole::Player => BookingFilter::Player(caller),
        BookingRole::Coach => BookingFilter::Coach(caller),
    };
    let stores = state.require_stores().await?;
    let bookings = stores.coaching.list_bookings(filter).await?;
    Ok(bookings.iter().map(BookingView::from).collect())
}

async fn load_slot(stores: &Stores, id: Uuid) -> Result<CoachSlotEntity, ServiceError> {
    stores
        .coaching
        .find_slot(id)
        .await?
        .ok_or_else(|| CoachRuleError::SlotNotFound(id).into())
}

async fn load_booking(stores: &Stores, id: Uuid) -> Result<CoachBookingEntity, ServiceError> {
    stores
        .coaching
        .find_booking(id)
        .await?
        .ok_or_else(|| CoachRuleError::BookingNotFound(id).into())
}

async fn no_longer_pending(stores: &Stores, id: Uuid) -> ServiceError {
    match load_booking(stores, id).await {
        Ok(current) => CoachRuleError::NotPending(current.status).into(),
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{CoachStore, memory::MemoryStore},
            storage::StorageResult,
        },
        state::{AppState, clock::ManualClock},
    };

    const NOW: OffsetDateTime = datetime!(2026-05-01 08:00 UTC);

    async fn app() -> SharedState {
        let state =
            AppState::with_clock(AppConfig::default(), Arc::new(ManualClock::new(NOW)));
        state.set_stores(MemoryStore::new().stores()).await;
        state
    }

    fn slot_request(start: OffsetDateTime) -> CreateSlotRequest {
        CreateSlotRequest {
            date: start.date().to_string(),
            start_time: start,
            end_time: start + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn duplicate_slot_is_a_conflict() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let start = NOW + Duration::days(1);
        create_slot(&state, coach_id, slot_request(start)).await.unwrap();

        let err = create_slot(&state, coach_id, slot_request(start))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        create_slot(&state, Uuid::new_v4(), slot_request(start))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn booked_slot_cannot_be_deleted() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        let booking = request_booking(&state, Uuid::new_v4(), slot.id).await.unwrap();

        let err = delete_slot(&state, slot.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        accept_booking(&state, booking.id, coach_id).await.unwrap();
        let err = delete_slot(&state, slot.id, coach_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejection_reason_defaults() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        let booking = request_booking(&state, Uuid::new_v4(), slot.id).await.unwrap();

        let rejected = reject_booking(&state, booking.id, coach_id, Some("  ".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, CoachBookingStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some(coach::DEFAULT_REJECTION_REASON)
        );

        let err = reject_booking(&state, booking.id, coach_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn player_sees_own_bookings_and_coach_sees_theirs() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        request_booking(&state, player_id, slot.id).await.unwrap();

        assert_eq!(
            list_bookings(&state, player_id, BookingRole::Player)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            list_bookings(&state, coach_id, BookingRole::Coach)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            list_bookings(&state, coach_id, BookingRole::Player)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn second_acceptance_finds_the_slot_taken() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let first = request_booking(&state, alice, slot.id).await.unwrap();
        let second = request_booking(&state, bob, slot.id).await.unwrap();

        let accepted = accept_booking(&state, first.id, coach_id).await.unwrap();
        assert_eq!(accepted.status, CoachBookingStatus::Accepted);

        let err = accept_booking(&state, second.id, coach_id).await.unwrap_err();
        assert_eq!(err.to_string(), "conflict: slot no longer available");

        let bookings = list_bookings(&state, bob, BookingRole::Player).await.unwrap();
        assert_eq!(bookings[0].status, CoachBookingStatus::Pending);
        let slots = list_slots(
            &state,
            ListSlotsQuery {
                coach_id: Some(coach_id),
                date: None,
                available_only: false,
            },
        )
        .await
        .unwrap();
        assert!(slots[0].is_booked);
        assert_eq!(slots[0].booked_by, Some(alice));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acceptances_book_the_slot_once() {
        let state = app().await;
        let coach_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        let mut requested = Vec::new();
        for _ in 0..4 {
            requested.push(request_booking(&state, Uuid::new_v4(), slot.id).await.unwrap());
        }

        let handles: Vec<_> = requested
            .iter()
            .map(|booking| {
                let state = state.clone();
                let booking_id = booking.id;
                tokio::spawn(async move { accept_booking(&state, booking_id, coach_id).await })
            })
            .collect();
        let mut winners = Vec::new();
        for handle in handles {
            if let Ok(booking) = handle.await.unwrap() {
                winners.push(booking);
            }
        }
        assert_eq!(winners.len(), 1);

        let bookings = list_bookings(&state, coach_id, BookingRole::Coach).await.unwrap();
        let accepted: Vec<_> = bookings
            .iter()
            .filter(|booking| booking.status == CoachBookingStatus::Accepted)
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, winners[0].id);

        let slots = list_slots(
            &state,
            ListSlotsQuery {
                coach_id: Some(coach_id),
                date: None,
                available_only: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(slots[0].booked_by, Some(accepted[0].player_id));
    }

    /// Coach store whose booking transitions always lose and whose releases fail.
    struct LostTransitionStore {
        inner: MemoryStore,
    }

    impl CoachStore for LostTransitionStore {
        fn insert_slot(&self, slot: CoachSlotEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_slot(slot)
        }

        fn find_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CoachSlotEntity>>> {
            self.inner.find_slot(id)
        }

        fn list_slots(
            &self,
            filter: SlotFilter,
        ) -> BoxFuture<'static, StorageResult<Vec<CoachSlotEntity>>> {
            self.inner.list_slots(filter)
        }

        fn delete_unbooked_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_unbooked_slot(id)
        }

        fn claim_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.claim_slot(id, player)
        }

        fn release_slot(&self, _id: Uuid, _player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async {
                Err(StorageError::unavailable(
                    "release failed".into(),
                    std::io::Error::other("connection reset"),
                ))
            })
        }

        fn insert_booking(
            &self,
            booking: CoachBookingEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_booking(booking)
        }

        fn find_booking(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<CoachBookingEntity>>> {
            self.inner.find_booking(id)
        }

        fn list_bookings(
            &self,
            filter: BookingFilter,
        ) -> BoxFuture<'static, StorageResult<Vec<CoachBookingEntity>>> {
            self.inner.list_bookings(filter)
        }

        fn transition_booking(
            &self,
            _id: Uuid,
            _transition: BookingTransition,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    #[tokio::test]
    async fn failed_release_surfaces_the_storage_error() {
        let memory = MemoryStore::new();
        let state =
            AppState::with_clock(AppConfig::default(), Arc::new(ManualClock::new(NOW)));
        state
            .set_stores(Stores {
                games: memory.stores().games,
                coaching: Arc::new(LostTransitionStore {
                    inner: memory.clone(),
                }),
            })
            .await;
        let coach_id = Uuid::new_v4();
        let slot = create_slot(&state, coach_id, slot_request(NOW + Duration::days(1)))
            .await
            .unwrap();
        let booking = request_booking(&state, Uuid::new_v4(), slot.id).await.unwrap();

        let err = accept_booking(&state, booking.id, coach_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}

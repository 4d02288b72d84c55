//! Join-request operations shared by the legacy and current route shapes.
//!
//! Writes that can add a user to an approved set hold that user's lock while
//! the overlap check and the conditional game write run, so two approvals for
//! overlapping games cannot both land.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::JoinRequestStatus,
    error::ServiceError,
    services::game_service::mutate_game,
    state::{
        SharedState,
        join_requests::{self, Approval},
    },
};

/// File a pending join request for `requester`.
pub async fn create(
    state: &SharedState,
    game_id: Uuid,
    requester: Uuid,
) -> Result<JoinRequestStatus, ServiceError> {
    let stores = state.require_stores().await?;
    let _guard = state.user_locks().lock(requester).await;
    let requester_games = stores.games.find_active_games_for_user(requester).await?;

    mutate_game(state, game_id, |game, now| {
        join_requests::create(game, requester, now, &requester_games).map_err(Into::into)
    })
    .await?;

    info!(game_id = %game_id, user_id = %requester, "join request filed");
    Ok(JoinRequestStatus::Pending)
}

/// Approve `player`'s pending request on behalf of `caller`, who must host the game.
pub async fn approve(
    state: &SharedState,
    game_id: Uuid,
    player: Uuid,
    caller: Uuid,
) -> Result<Approval, ServiceError> {
    let stores = state.require_stores().await?;
    let _guard = state.user_locks().lock(player).await;
    let player_games = stores.games.find_active_games_for_user(player).await?;

    let mut approval = None;
    mutate_game(state, game_id, |game, now| {
        approval = Some(join_requests::approve(
            game,
            player,
            caller,
            now,
            &player_games,
        )?);
        Ok(())
    })
    .await?;

    let approval = approval.ok_or_else(|| {
        ServiceError::Conflict("approval was not applied; please retry".into())
    })?;
    info!(
        game_id = %game_id,
        user_id = %player,
        approved = approval.approved_count,
        status = ?approval.status,
        "join request approved"
    );
    Ok(approval)
}

/// Reject `player`'s pending request. The player cannot request this game again.
pub async fn reject(
    state: &SharedState,
    game_id: Uuid,
    player: Uuid,
    caller: Uuid,
) -> Result<JoinRequestStatus, ServiceError> {
    mutate_game(state, game_id, |game, now| {
        join_requests::reject(game, player, caller, now).map_err(Into::into)
    })
    .await?;

    info!(game_id = %game_id, user_id = %player, "join request rejected");
    Ok(JoinRequestStatus::Rejected)
}

/// Withdraw the requester's own pending request before the cancellation cutoff.
pub async fn cancel(
    state: &SharedState,
    game_id: Uuid,
    requester: Uuid,
) -> Result<(), ServiceError> {
    let cutoff = state.config().join_cancel_cutoff;
    mutate_game(state, game_id, |game, now| {
        join_requests::cancel(game, requester, now, cutoff).map_err(Into::into)
    })
    .await?;

    info!(game_id = %game_id, user_id = %requester, "join request withdrawn");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::{Duration, OffsetDateTime, macros::datetime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryStore},
            models::{GameEntity, GameStatus, JoinRequestEntity},
        },
        state::{AppState, clock::ManualClock, test_support::game_fixture},
    };

    const NOW: OffsetDateTime = datetime!(2026-05-01 08:00 UTC);

    async fn app_with(games: &[GameEntity]) -> (SharedState, MemoryStore) {
        let store = MemoryStore::new();
        for game in games {
            store.insert_game(game.clone()).await.unwrap();
        }
        let state =
            AppState::with_clock(AppConfig::default(), Arc::new(ManualClock::new(NOW)));
        state.set_stores(store.stores()).await;
        (state, store)
    }

    #[tokio::test]
    async fn approval_reaching_max_fills_the_game() {
        let host = Uuid::new_v4();
        let game = game_fixture(host, NOW + Duration::days(1), 2, 2);
        let (state, store) = app_with(std::slice::from_ref(&game)).await;
        let player = Uuid::new_v4();

        create(&state, game.id, player).await.unwrap();
        let approval = approve(&state, game.id, player, host).await.unwrap();

        assert_eq!(approval.approved_count, 2);
        assert_eq!(approval.status, GameStatus::Full);
        let stored = store.find_game(game.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn approval_is_blocked_by_an_overlapping_approved_game() {
        let (host_a, host_b) = (Uuid::new_v4(), Uuid::new_v4());
        let start = NOW + Duration::days(1);
        let first = game_fixture(host_a, start, 2, 4);
        let second = game_fixture(host_b, start + Duration::minutes(30), 2, 4);
        let (state, _) = app_with(&[first.clone(), second.clone()]).await;
        let player = Uuid::new_v4();

        create(&state, first.id, player).await.unwrap();
        create(&state, second.id, player).await.unwrap();
        approve(&state, first.id, player, host_a).await.unwrap();

        let err = approve(&state, second.id, player, host_b).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn withdrawn_request_can_be_filed_again() {
        let game = game_fixture(Uuid::new_v4(), NOW + Duration::days(1), 2, 4);
        let (state, _) = app_with(std::slice::from_ref(&game)).await;
        let player = Uuid::new_v4();

        create(&state, game.id, player).await.unwrap();
        cancel(&state, game.id, player).await.unwrap();
        create(&state, game.id, player).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let (state, _) = app_with(&[]).await;
        let err = create(&state, Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_never_exceed_capacity() {
        let host = Uuid::new_v4();
        let game = game_fixture(host, NOW + Duration::days(1), 2, 3);
        let (state, store) = app_with(std::slice::from_ref(&game)).await;
        let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for player in &players {
            create(&state, game.id, *player).await.unwrap();
        }

        let handles: Vec<_> = players
            .iter()
            .map(|player| {
                let state = state.clone();
                let (game_id, player) = (game.id, *player);
                tokio::spawn(async move { approve(&state, game_id, player, host).await })
            })
            .collect();
        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                approved += 1;
            }
        }

        let stored = store.find_game(game.id).await.unwrap().unwrap();
        assert!(approved <= 2);
        assert!(stored.approved_players.len() <= 3);
        assert_eq!(stored.approved_players.len(), 1 + approved);
    }

    #[tokio::test]
    async fn withdrawal_cutoff_is_measured_against_the_clock() {
        let at_cutoff = game_fixture(Uuid::new_v4(), NOW + Duration::hours(2), 2, 4);
        let inside_cutoff = game_fixture(
            Uuid::new_v4(),
            NOW + Duration::hours(2) - Duration::seconds(1),
            2,
            4,
        );
        let (state, _) = app_with(&[at_cutoff.clone(), inside_cutoff.clone()]).await;
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        create(&state, at_cutoff.id, first).await.unwrap();
        cancel(&state, at_cutoff.id, first).await.unwrap();

        create(&state, inside_cutoff.id, second).await.unwrap();
        let err = cancel(&state, inside_cutoff.id, second).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejected_player_cannot_ask_again() {
        let host = Uuid::new_v4();
        let game = game_fixture(host, NOW + Duration::days(1), 2, 4);
        let (state, _) = app_with(std::slice::from_ref(&game)).await;
        let player = Uuid::new_v4();

        create(&state, game.id, player).await.unwrap();
        reject(&state, game.id, player, host).await.unwrap();

        let err = reject(&state, game.id, player, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let err = create(&state, game.id, player).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn approving_a_player_already_on_the_roster_keeps_the_count() {
        let host = Uuid::new_v4();
        let player = Uuid::new_v4();
        let mut game = game_fixture(host, NOW + Duration::days(1), 2, 4);
        game.approved_players.push(player);
        game.join_requests.push(JoinRequestEntity {
            user: player,
            status: JoinRequestStatus::Pending,
            requested_at: NOW,
        });
        let (state, store) = app_with(std::slice::from_ref(&game)).await;

        let approval = approve(&state, game.id, player, host).await.unwrap();

        assert_eq!(approval.approved_count, 2);
        let stored = store.find_game(game.id).await.unwrap().unwrap();
        assert_eq!(stored.approved_players, vec![host, player]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_into_overlapping_games_admit_one() {
        let (host_a, host_b) = (Uuid::new_v4(), Uuid::new_v4());
        let start = NOW + Duration::days(1);
        let first = game_fixture(host_a, start, 2, 4);
        let second = game_fixture(host_b, start + Duration::minutes(30), 2, 4);
        let (state, store) = app_with(&[first.clone(), second.clone()]).await;
        let player = Uuid::new_v4();
        create(&state, first.id, player).await.unwrap();
        create(&state, second.id, player).await.unwrap();

        let handles: Vec<_> = [(first.id, host_a), (second.id, host_b)]
            .into_iter()
            .map(|(game_id, host)| {
                let state = state.clone();
                tokio::spawn(async move { approve(&state, game_id, player, host).await })
            })
            .collect();
        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                approved += 1;
            }
        }

        assert_eq!(approved, 1);
        let holding = store.find_active_games_for_user(player).await.unwrap();
        assert_eq!(holding.len(), 1);
    }
}

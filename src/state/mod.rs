/// Time sources.
pub mod clock;
/// Coach slot and booking rules.
pub mod coach;
/// Time windows and game-level guards.
pub mod game;
/// Join-request rules.
pub mod join_requests;
/// Keyed async locks.
pub mod locks;
/// Sport references and pricing.
pub mod sport;
/// Game and request transition tables.
pub mod state_machine;
#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::game_store::Stores,
    error::ServiceError,
    state::{
        clock::{Clock, SystemClock},
        locks::KeyedLocks,
    },
};

/// Cheaply clonable handle on [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state storing the database handles and runtime settings.
pub struct AppState {
    stores: RwLock<Option<Stores>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    user_locks: KeyedLocks,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit time source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            stores: RwLock::new(None),
            degraded: degraded_tx,
            config,
            clock,
            user_locks: KeyedLocks::new(),
        })
    }

    /// Obtain the installed stores, if any.
    pub async fn stores(&self) -> Option<Stores> {
        let guard = self.stores.read().await;
        guard.as_ref().cloned()
    }

    /// Stores for a request, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_stores(&self) -> Result<Stores, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.stores().await.ok_or(ServiceError::Degraded)
    }

    /// Install new store handles and leave degraded mode.
    pub async fn set_stores(&self, stores: Stores) {
        {
            let mut guard = self.stores.write().await;
            *guard = Some(stores);
        }
        self.update_degraded(false);
    }

    /// Remove the current stores and enter degraded mode.
    pub async fn clear_stores(&self) {
        {
            let mut guard = self.stores.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Loaded booking policy.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current wall-clock time.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Locks serialising writes that can change one user's commitments.
    pub fn user_locks(&self) -> &KeyedLocks {
        &self.user_locks
    }
}

use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The persisted document moved past the version the caller read.
    #[error("document `{id}` was modified concurrently (expected version {expected})")]
    VersionConflict {
        /// Document id.
        id: Uuid,
        /// Version the caller read.
        expected: u64,
    },
    /// A uniqueness constraint rejected the write.
    #[error("duplicate entry: {message}")]
    Duplicate {
        /// Which constraint was hit.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

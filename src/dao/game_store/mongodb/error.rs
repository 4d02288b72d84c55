use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

/// Result alias for MongoDB DAO operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures of the MongoDB backend, mapped onto [`StorageError`] at the trait boundary.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string did not parse.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An insert or update failed.
    #[error("failed to write {collection} document `{id}`")]
    Write {
        /// Collection name.
        collection: &'static str,
        /// Document id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A single-document read failed.
    #[error("failed to read {collection} document `{id}`")]
    Load {
        /// Collection name.
        collection: &'static str,
        /// Document id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A cursor query failed.
    #[error("failed to query {collection}")]
    Query {
        /// Collection name.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A stored document could not be decoded.
    #[error("{collection} document `{id}` is malformed: {reason}")]
    Corrupt {
        /// Collection name.
        collection: &'static str,
        /// Document id.
        id: Uuid,
        /// Decode failure.
        reason: String,
    },
    /// A conditional replace matched no document.
    #[error("game `{id}` no longer has version {expected}")]
    VersionConflict {
        /// Game id.
        id: Uuid,
        /// Version the replace expected.
        expected: u64,
    },
    /// A unique index rejected the write.
    #[error("{message}")]
    Duplicate {
        /// Which constraint was hit.
        message: String,
    },
}

impl MongoDaoError {
    /// Wrap a failed insert, recognising unique index violations.
    pub fn from_insert(
        // Collection name.
        collection: &'static str,
        // Document id.
        id: Uuid,
        duplicate_message: &str,
        // Driver error.
        source: MongoError,
    ) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::Duplicate {
                message: duplicate_message.to_owned(),
            }
        } else {
            MongoDaoError::Write {
                collection,
                id,
                source,
            }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::VersionConflict { id, expected } => {
                StorageError::VersionConflict { id, expected }
            }
            MongoDaoError::Duplicate { message } => StorageError::Duplicate { message },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

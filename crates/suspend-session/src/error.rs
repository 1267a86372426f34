//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(#[from] suspend_storage::StorageError),

    #[error("Unknown value kind: {0}")]
    UnknownKind(String),

    #[error("Invalid payload for kind {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("A save or restore is already in progress")]
    Busy,

    #[error("Frame state key does not hold a map: {0}")]
    FrameStateType(String),
}

/// Returned by a frame that cannot apply a saved navigation state
#[derive(Error, Debug)]
#[error("Invalid navigation state: {0}")]
pub struct NavigationStateError(pub String);

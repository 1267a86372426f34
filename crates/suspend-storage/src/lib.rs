//! Suspend Storage Layer
//!
//! Durable home of the session snapshot: one file in the application's
//! private data directory, replaced atomically on every save.
//! The file holds a versioned envelope whose payload is checksummed so a
//! truncated or hand-edited snapshot is rejected instead of half-loaded.

mod envelope;
mod error;
mod state_file;

pub use envelope::{SnapshotEnvelope, ENVELOPE_VERSION};
pub use error::StorageError;
pub use state_file::{StateFile, DEFAULT_STATE_FILE_NAME};

pub type Result<T> = std::result::Result<T, StorageError>;

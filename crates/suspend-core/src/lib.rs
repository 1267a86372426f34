//! Suspend Core
//!
//! Application-level wiring: one `AppContext` per process owns the
//! configuration and the session state store, and drives the
//! launch / suspend / resume / shutdown lifecycle.

mod config;
mod context;
mod error;

pub use config::Config;
pub use context::{AppContext, ExecutionState};
pub use error::CoreError;

// Re-export components
pub use suspend_navigation::{
    page_key, LoadStateEvent, NavigationError, NavigationEvent, NavigationHelper, NavigationMode,
    PageEntry, RelayCommand, SaveStateEvent, StackFrame,
};
pub use suspend_session::{
    CustomValue, FrameRef, KnownType, KnownTypes, NavigationFrame, NavigationStateError,
    PersistenceError, SessionError, SessionStateStore, StateMap, StateValue,
};
pub use suspend_storage::{StateFile, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}

//! Suspend Session State
//!
//! - Session state is a single key/value map owned by a `SessionStateStore`
//! - The whole map is snapshotted to one file on save and replaced wholesale on restore
//! - Navigation frames registered with the store get a sub-map of session state
//!   and have their back stack captured on save and reapplied on restore
//! - Unregistered frames get transient state that is never persisted
//! - Custom value kinds must be registered as known types before save/restore

mod error;
mod frame;
mod known_types;
mod store;
mod value;

pub use error::{NavigationStateError, PersistenceError, SessionError};
pub use frame::{FrameRef, NavigationFrame, WeakFrameRef};
pub use known_types::{KnownType, KnownTypes};
pub use store::{SessionStateStore, NAVIGATION_STATE_KEY};
pub use value::{CustomValue, StateMap, StateValue};

pub type Result<T> = std::result::Result<T, SessionError>;

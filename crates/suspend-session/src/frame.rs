//! Navigation frames and the store's side table of frame registrations

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::error::NavigationStateError;

/// A navigation context with its own back/forward history, supplied by the host.
///
/// The store locks a frame while it holds its own lock, so implementations
/// must not call back into the store from these methods, and callers must
/// not hold a frame lock while calling the store.
pub trait NavigationFrame: Send {
    /// Opaque encoding of the frame's back/forward stacks
    fn navigation_state(&self) -> String;

    /// Replace the frame's stacks with a previously captured encoding
    fn set_navigation_state(&mut self, state: &str) -> Result<(), NavigationStateError>;

    /// Number of entries behind the current page
    fn back_stack_depth(&self) -> usize;

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    /// Returns false when there was nothing to go back to
    fn go_back(&mut self) -> bool;

    /// Returns false when there was nothing to go forward to
    fn go_forward(&mut self) -> bool;
}

pub type FrameRef = Arc<Mutex<dyn NavigationFrame>>;
pub type WeakFrameRef = Weak<Mutex<dyn NavigationFrame>>;

/// What the store knows about one frame
pub(crate) struct FrameEntry {
    pub frame: WeakFrameRef,
    /// Session state key, including the group prefix; `None` when unregistered
    pub state_key: Option<String>,
    pub group_key: Option<String>,
    /// Frame state has been handed out since registration or the last restore
    pub materialized: bool,
    /// State of an unregistered frame; never persisted
    pub transient: crate::value::StateMap,
}

impl FrameEntry {
    pub fn new(frame: &FrameRef) -> Self {
        Self {
            frame: Arc::downgrade(frame),
            state_key: None,
            group_key: None,
            materialized: false,
            transient: Default::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.frame.strong_count() > 0
    }

    pub fn is_registered(&self) -> bool {
        self.state_key.is_some()
    }

    pub fn refers_to(&self, frame: &FrameRef) -> bool {
        std::ptr::addr_eq(self.frame.as_ptr(), Arc::as_ptr(frame))
    }
}

/// Session key for a frame, prefixed by its group when there is one
pub(crate) fn composite_key(key: &str, group_key: Option<&str>) -> String {
    match group_key {
        Some(group) => format!("{}_{}", group, key),
        None => key.to_string(),
    }
}

//! In-memory navigation frame
//!
//! ```text
//! back: [A, B]  current: C  forward: [D]
//!   go_back    -> back: [A]     current: B  forward: [C, D]
//!   navigate E -> back: [A, B, C] current: E forward: []
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use suspend_session::{FrameRef, NavigationFrame, NavigationStateError, StateValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// A fresh navigation that adds to the back stack
    New,
    Back,
    Forward,
    /// The current page is shown again, e.g. after its frame was restored
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Page identifier, chosen by the host
    pub page: String,
    /// Parameter passed to the page when it was navigated to
    pub parameter: Option<StateValue>,
}

/// A page being entered
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationEvent {
    pub mode: NavigationMode,
    pub page: String,
    pub parameter: Option<StateValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Stacks {
    back: Vec<PageEntry>,
    current: Option<PageEntry>,
    forward: Vec<PageEntry>,
}

#[derive(Debug, Default)]
pub struct StackFrame {
    stacks: Stacks,
    /// Last page entered, not yet taken by the host
    pending: Option<NavigationEvent>,
}

impl StackFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in a shareable frame handle
    pub fn into_ref(self) -> FrameRef {
        Arc::new(Mutex::new(self))
    }

    /// Navigate to `page`, dropping the forward stack
    pub fn navigate(&mut self, page: impl Into<String>, parameter: Option<StateValue>) {
        if let Some(current) = self.stacks.current.take() {
            self.stacks.back.push(current);
        }
        self.stacks.forward.clear();

        let entry = PageEntry {
            page: page.into(),
            parameter,
        };
        self.enter(NavigationMode::New, &entry);
        self.stacks.current = Some(entry);
    }

    pub fn current(&self) -> Option<&PageEntry> {
        self.stacks.current.as_ref()
    }

    pub fn back_stack(&self) -> &[PageEntry] {
        &self.stacks.back
    }

    pub fn forward_stack(&self) -> &[PageEntry] {
        &self.stacks.forward
    }

    /// Take the event for the page most recently entered
    pub fn take_navigation(&mut self) -> Option<NavigationEvent> {
        self.pending.take()
    }

    fn enter(&mut self, mode: NavigationMode, entry: &PageEntry) {
        tracing::debug!(page = %entry.page, mode = ?mode, depth = self.stacks.back.len(), "Entered page");
        self.pending = Some(NavigationEvent {
            mode,
            page: entry.page.clone(),
            parameter: entry.parameter.clone(),
        });
    }
}

impl NavigationFrame for StackFrame {
    fn navigation_state(&self) -> String {
        serde_json::to_string(&self.stacks).unwrap_or_default()
    }

    fn set_navigation_state(&mut self, state: &str) -> Result<(), NavigationStateError> {
        let stacks: Stacks =
            serde_json::from_str(state).map_err(|e| NavigationStateError(e.to_string()))?;
        self.stacks = stacks;

        if let Some(current) = self.stacks.current.clone() {
            self.enter(NavigationMode::Refresh, &current);
        }
        Ok(())
    }

    fn back_stack_depth(&self) -> usize {
        self.stacks.back.len()
    }

    fn can_go_back(&self) -> bool {
        !self.stacks.back.is_empty()
    }

    fn can_go_forward(&self) -> bool {
        !self.stacks.forward.is_empty()
    }

    fn go_back(&mut self) -> bool {
        let Some(previous) = self.stacks.back.pop() else {
            return false;
        };
        if let Some(current) = self.stacks.current.take() {
            self.stacks.forward.insert(0, current);
        }
        self.enter(NavigationMode::Back, &previous);
        self.stacks.current = Some(previous);
        true
    }

    fn go_forward(&mut self) -> bool {
        if self.stacks.forward.is_empty() {
            return false;
        }
        let next = self.stacks.forward.remove(0);
        if let Some(current) = self.stacks.current.take() {
            self.stacks.back.push(current);
        }
        self.enter(NavigationMode::Forward, &next);
        self.stacks.current = Some(next);
        true
    }
}

//! Navigation helper
//!
//! One helper per page. The host forwards the page's navigated-to and
//! navigated-from notifications; the helper hands saved page state back to
//! the page on return visits and collects it again when the page is left.

use std::sync::Arc;

use suspend_session::{
    FrameRef, NavigationFrame, SessionStateStore, StateMap, StateValue, WeakFrameRef,
};

use crate::command::RelayCommand;
use crate::error::NavigationError;
use crate::stack_frame::{NavigationEvent, NavigationMode};
use crate::Result;

pub const PAGE_KEY_PREFIX: &str = "Page-";

/// Frame state key for the page at back-stack `depth`
pub fn page_key(depth: usize) -> String {
    format!("{}{}", PAGE_KEY_PREFIX, depth)
}

fn page_index(key: &str) -> Option<usize> {
    key.strip_prefix(PAGE_KEY_PREFIX)?.parse().ok()
}

/// Passed to load-state handlers when a page is entered
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStateEvent {
    pub navigation_parameter: Option<StateValue>,
    /// State saved when the page was last left; `None` on fresh navigation
    pub page_state: Option<StateMap>,
}

/// Passed to save-state handlers when a page is left; handlers fill `page_state`
#[derive(Debug, Default)]
pub struct SaveStateEvent {
    pub page_state: StateMap,
}

type LoadStateHandler = Box<dyn FnMut(&LoadStateEvent) + Send>;
type SaveStateHandler = Box<dyn FnMut(&mut SaveStateEvent) + Send>;

pub struct NavigationHelper {
    frame: WeakFrameRef,
    store: SessionStateStore,
    /// Key of the page as of the last navigated-to
    page_key: Option<String>,
    go_back_command: RelayCommand,
    go_forward_command: RelayCommand,
    load_state_handlers: Vec<LoadStateHandler>,
    save_state_handlers: Vec<SaveStateHandler>,
}

impl NavigationHelper {
    pub fn new(frame: &FrameRef, store: SessionStateStore) -> Self {
        let frame = Arc::downgrade(frame);

        Self {
            go_back_command: back_command(frame.clone()),
            go_forward_command: forward_command(frame.clone()),
            frame,
            store,
            page_key: None,
            load_state_handlers: Vec::new(),
            save_state_handlers: Vec::new(),
        }
    }

    // Navigation support

    pub fn go_back_command(&self) -> &RelayCommand {
        &self.go_back_command
    }

    pub fn set_go_back_command(&mut self, command: RelayCommand) {
        self.go_back_command = command;
    }

    pub fn go_forward_command(&self) -> &RelayCommand {
        &self.go_forward_command
    }

    pub fn can_go_back(&self) -> bool {
        self.frame
            .upgrade()
            .is_some_and(|frame| frame.lock().can_go_back())
    }

    pub fn can_go_forward(&self) -> bool {
        self.frame
            .upgrade()
            .is_some_and(|frame| frame.lock().can_go_forward())
    }

    pub fn go_back(&self) -> bool {
        go_back(&self.frame)
    }

    pub fn go_forward(&self) -> bool {
        go_forward(&self.frame)
    }

    // Process lifetime management

    pub fn page_key(&self) -> Option<&str> {
        self.page_key.as_deref()
    }

    pub fn on_load_state<F>(&mut self, handler: F)
    where
        F: FnMut(&LoadStateEvent) + Send + 'static,
    {
        self.load_state_handlers.push(Box::new(handler));
    }

    pub fn on_save_state<F>(&mut self, handler: F)
    where
        F: FnMut(&mut SaveStateEvent) + Send + 'static,
    {
        self.save_state_handlers.push(Box::new(handler));
    }

    /// The page has been entered.
    ///
    /// A fresh navigation discards state kept for this depth and deeper, so a
    /// new branch of the back stack never sees pages from an abandoned one.
    /// Any other mode hands the page the state it saved on the way out.
    pub fn on_navigated_to(&mut self, event: &NavigationEvent) -> Result<()> {
        let frame = self.frame()?;
        let depth = frame.lock().back_stack_depth();
        let page_key = page_key(depth);

        let page_state = self.store.with_frame_state(&frame, |state| {
            if event.mode == NavigationMode::New {
                let purged = purge_forward_state(state, depth);
                if purged > 0 {
                    tracing::debug!(depth, purged, "Discarded forward page state");
                }
                None
            } else {
                state.get(&page_key).and_then(StateValue::as_map).cloned()
            }
        })?;

        self.page_key = Some(page_key);

        let load = LoadStateEvent {
            navigation_parameter: event.parameter.clone(),
            page_state,
        };
        for handler in &mut self.load_state_handlers {
            handler(&load);
        }

        Ok(())
    }

    /// The page is being left; collect its state into the frame state
    pub fn on_navigated_from(&mut self) -> Result<()> {
        let frame = self.frame()?;
        let page_key = self.page_key.clone().ok_or(NavigationError::NotNavigated)?;

        let mut save = SaveStateEvent::default();
        for handler in &mut self.save_state_handlers {
            handler(&mut save);
        }

        self.store.with_frame_state(&frame, |state| {
            state.insert(page_key, StateValue::Map(save.page_state));
        })?;

        Ok(())
    }

    fn frame(&self) -> Result<FrameRef> {
        self.frame.upgrade().ok_or(NavigationError::FrameDropped)
    }
}

/// Remove `Page-N` entries with `N >= depth`
fn purge_forward_state(state: &mut StateMap, depth: usize) -> usize {
    let before = state.len();
    state.retain(|key, _| page_index(key).map_or(true, |index| index < depth));
    before - state.len()
}

fn go_back(frame: &WeakFrameRef) -> bool {
    match frame.upgrade() {
        Some(frame) => {
            let mut frame = frame.lock();
            frame.can_go_back() && frame.go_back()
        }
        None => false,
    }
}

fn go_forward(frame: &WeakFrameRef) -> bool {
    match frame.upgrade() {
        Some(frame) => {
            let mut frame = frame.lock();
            frame.can_go_forward() && frame.go_forward()
        }
        None => false,
    }
}

fn back_command(frame: WeakFrameRef) -> RelayCommand {
    let check = frame.clone();
    RelayCommand::with_can_execute(
        move || {
            go_back(&frame);
        },
        move || check.upgrade().is_some_and(|f| f.lock().can_go_back()),
    )
}

fn forward_command(frame: WeakFrameRef) -> RelayCommand {
    let check = frame.clone();
    RelayCommand::with_can_execute(
        move || {
            go_forward(&frame);
        },
        move || check.upgrade().is_some_and(|f| f.lock().can_go_forward()),
    )
}

//! Relay commands
//!
//! A command wraps an action and an optional enabled check so a UI can bind
//! a button to it and grey the button out when the check fails.

use parking_lot::Mutex;

type Action = Box<dyn Fn() + Send + Sync>;
type Predicate = Box<dyn Fn() -> bool + Send + Sync>;
type Listener = Box<dyn Fn() + Send + Sync>;

pub struct RelayCommand {
    execute: Action,
    can_execute: Option<Predicate>,
    /// Notified by `raise_can_execute_changed`
    listeners: Mutex<Vec<Listener>>,
}

impl RelayCommand {
    /// A command that is always enabled
    pub fn new<F>(execute: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            execute: Box::new(execute),
            can_execute: None,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn with_can_execute<F, P>(execute: F, can_execute: P) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            execute: Box::new(execute),
            can_execute: Some(Box::new(can_execute)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn can_execute(&self) -> bool {
        self.can_execute.as_ref().map_or(true, |check| check())
    }

    /// Run the action without consulting `can_execute`
    pub fn execute(&self) {
        (self.execute)();
    }

    /// Run the action only if the command is enabled
    pub fn execute_if_enabled(&self) -> bool {
        if !self.can_execute() {
            return false;
        }
        self.execute();
        true
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Tell subscribers that `can_execute` may return something different now
    pub fn raise_can_execute_changed(&self) {
        for listener in self.listeners.lock().iter() {
            listener();
        }
    }
}

impl std::fmt::Debug for RelayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayCommand")
            .field("can_execute", &self.can_execute())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_always_enabled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let command = RelayCommand::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(command.can_execute());
        command.execute();
        assert!(command.execute_if_enabled());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_command_is_skipped() {
        let enabled = Arc::new(AtomicBool::new(false));
        let runs = Arc::new(AtomicUsize::new(0));

        let check = Arc::clone(&enabled);
        let counter = Arc::clone(&runs);
        let command = RelayCommand::with_can_execute(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            move || check.load(Ordering::SeqCst),
        );

        assert!(!command.execute_if_enabled());
        enabled.store(true, Ordering::SeqCst);
        assert!(command.execute_if_enabled());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_can_execute_changed_notifies_subscribers() {
        let notified = Arc::new(AtomicUsize::new(0));
        let command = RelayCommand::new(|| {});

        for _ in 0..2 {
            let notified = Arc::clone(&notified);
            command.subscribe(move || {
                notified.fetch_add(1, Ordering::SeqCst);
            });
        }
        command.raise_can_execute_changed();

        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }
}

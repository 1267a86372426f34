//! Application context
//!
//! Owns the session state store for the life of the process. The host calls
//! `launch` once its root frame exists, `suspend` when the platform is about
//! to suspend the app, `resume` when a suspended app comes back, and
//! `shutdown` on exit.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use suspend_navigation::NavigationHelper;
use suspend_session::{FrameRef, KnownType, SessionStateStore};

use crate::config::Config;
use crate::Result;

/// How the app was running, as reported by the platform at launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    NotRunning,
    Running,
    Suspended,
    /// Terminated by the system while suspended; session state should be restored
    Terminated,
    ClosedByUser,
}

pub struct AppContext {
    config: Config,
    store: SessionStateStore,
    state: Arc<RwLock<ExecutionState>>,
}

impl AppContext {
    /// Create the private data directory and an empty session state
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let store = SessionStateStore::new(config.state_file());

        tracing::info!(
            data_dir = %config.data_dir.display(),
            state_file = %config.state_file_name,
            "Created application context"
        );

        Ok(Self {
            config,
            store,
            state: Arc::new(RwLock::new(ExecutionState::NotRunning)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SessionStateStore {
        &self.store
    }

    pub fn execution_state(&self) -> ExecutionState {
        *self.state.read()
    }

    pub fn register_known_type<T: KnownType>(&self) -> bool {
        self.store.register_known_type::<T>()
    }

    /// Helper for a page hosted in `frame`
    pub fn navigation_helper(&self, frame: &FrameRef) -> NavigationHelper {
        NavigationHelper::new(frame, self.store.clone())
    }

    /// Register the root frame and, if the previous run was terminated by the
    /// system, restore its session.
    ///
    /// A snapshot that cannot be restored is logged and treated as no
    /// snapshot. Returns whether session state was restored.
    pub async fn launch(&self, previous: ExecutionState, root_frame: &FrameRef) -> Result<bool> {
        self.store
            .register_frame(root_frame, &self.config.root_frame_key, None)?;

        let mut restored = false;
        if previous == ExecutionState::Terminated {
            match self.store.restore(None).await {
                Ok(()) => restored = true,
                Err(e) => tracing::warn!("Starting without previous session state: {}", e),
            }
        }

        *self.state.write() = ExecutionState::Running;

        tracing::info!(previous = ?previous, restored, "Launched");

        Ok(restored)
    }

    /// Save session state. Failure is not fatal; the in-memory state is kept.
    pub async fn suspend(&self) -> Result<()> {
        if let Err(e) = self.store.save().await {
            tracing::error!("Failed to save session state on suspend: {}", e);
            return Err(e.into());
        }

        *self.state.write() = ExecutionState::Suspended;
        Ok(())
    }

    /// Reload session state and restore frames in `group_key`
    pub async fn resume(&self, group_key: Option<&str>) -> Result<()> {
        self.store.restore(group_key).await?;
        *self.state.write() = ExecutionState::Running;
        Ok(())
    }

    /// Clear session state and frame registrations
    pub fn shutdown(&self) {
        self.store.reset();
        *self.state.write() = ExecutionState::NotRunning;
        tracing::info!("Shut down application context");
    }
}

impl Clone for AppContext {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: self.store.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

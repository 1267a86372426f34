//! Session State Store
//!
//! Owns the session map, the table of frames that have state, and the file
//! the map is snapshotted to. Cloning the store yields another handle to the
//! same state.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use suspend_storage::{SnapshotEnvelope, StateFile};

use crate::error::{PersistenceError, SessionError};
use crate::frame::{composite_key, FrameEntry, FrameRef, NavigationFrame};
use crate::known_types::{KnownType, KnownTypes};
use crate::value::{StateMap, StateValue};
use crate::Result;

/// Frame state key holding the frame's captured navigation state
pub const NAVIGATION_STATE_KEY: &str = "Navigation";

struct Inner {
    session: StateMap,
    frames: Vec<FrameEntry>,
}

impl Inner {
    fn position(&self, frame: &FrameRef) -> Option<usize> {
        self.frames.iter().position(|entry| entry.refers_to(frame))
    }

    /// Index of the frame's entry, adding an unregistered one if needed
    fn entry_index(&mut self, frame: &FrameRef) -> usize {
        match self.position(frame) {
            Some(index) => index,
            None => {
                self.frames.retain(FrameEntry::is_alive);
                self.frames.push(FrameEntry::new(frame));
                self.frames.len() - 1
            }
        }
    }

    fn frame_state_mut(&mut self, index: usize) -> Result<&mut StateMap> {
        let Inner { session, frames } = self;
        let entry = &mut frames[index];

        let state = match &entry.state_key {
            Some(key) => session
                .entry(key.clone())
                .or_insert_with(|| StateValue::Map(StateMap::new()))
                .as_map_mut()
                .ok_or_else(|| SessionError::FrameStateType(key.clone()))?,
            None => &mut entry.transient,
        };

        entry.materialized = true;
        Ok(state)
    }

    fn capture_navigation(&mut self, index: usize, frame: &FrameRef) -> Result<()> {
        let navigation = frame.lock().navigation_state();
        self.frame_state_mut(index)?
            .insert(NAVIGATION_STATE_KEY.to_string(), StateValue::Text(navigation));
        Ok(())
    }

    fn restore_navigation(&mut self, index: usize, frame: &FrameRef) -> Result<()> {
        let navigation = self
            .frame_state_mut(index)?
            .get(NAVIGATION_STATE_KEY)
            .and_then(StateValue::as_text)
            .map(str::to_string);

        if let Some(navigation) = navigation {
            if let Err(e) = frame.lock().set_navigation_state(&navigation) {
                tracing::warn!(
                    state_key = ?self.frames[index].state_key,
                    "Failed to restore frame navigation: {}",
                    e
                );
            }
        }

        Ok(())
    }

    /// Live registered frames with their entry index
    fn registered_frames(&self) -> Vec<(usize, FrameRef)> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_registered())
            .filter_map(|(index, entry)| entry.frame.upgrade().map(|frame| (index, frame)))
            .collect()
    }
}

/// Marks a save or restore as in flight until dropped
struct IoGuard(Arc<AtomicBool>);

impl Drop for IoGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SessionStateStore {
    inner: Arc<Mutex<Inner>>,
    known_types: Arc<RwLock<KnownTypes>>,
    state_file: StateFile,
    in_flight: Arc<AtomicBool>,
}

impl SessionStateStore {
    pub fn new(state_file: StateFile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                session: StateMap::new(),
                frames: Vec::new(),
            })),
            known_types: Arc::new(RwLock::new(KnownTypes::new())),
            state_file,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state_file(&self) -> &StateFile {
        &self.state_file
    }

    // Session state

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.inner.lock().session.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<StateValue>) -> Option<StateValue> {
        self.inner.lock().session.insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<StateValue> {
        self.inner.lock().session.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().session.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().session.is_empty()
    }

    /// Remove every session entry; frame registrations are kept
    pub fn clear(&self) {
        self.inner.lock().session.clear();
    }

    /// Copy of the whole session map
    pub fn session_state(&self) -> StateMap {
        self.inner.lock().session.clone()
    }

    pub fn with_session_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut StateMap) -> T,
    {
        f(&mut self.inner.lock().session)
    }

    // Known types

    pub fn register_known_type<T: KnownType>(&self) -> bool {
        self.known_types.write().register::<T>()
    }

    pub fn known_types(&self) -> KnownTypes {
        self.known_types.read().clone()
    }

    // Frames

    /// Register `frame` so its state is saved and restored with the session.
    ///
    /// With a non-empty `group_key` the session key becomes
    /// `"{group_key}_{key}"` and the frame is restored only by
    /// `restore(Some(group_key))`. If session state already holds navigation
    /// for the key, it is applied to the frame right away.
    pub fn register_frame(&self, frame: &FrameRef, key: &str, group_key: Option<&str>) -> Result<()> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.position(frame).map(|index| &inner.frames[index]) {
            if entry.is_registered() {
                return Err(SessionError::InvalidOperation(
                    "Frames can only be registered to one session state key".to_string(),
                ));
            }
            if entry.materialized {
                return Err(SessionError::InvalidOperation(
                    "Frames must be registered before accessing frame session state".to_string(),
                ));
            }
        }

        let group_key = group_key.filter(|g| !g.is_empty());
        let state_key = composite_key(key, group_key);
        if inner
            .session
            .get(&state_key)
            .is_some_and(|value| value.as_map().is_none())
        {
            return Err(SessionError::FrameStateType(state_key));
        }

        let index = inner.entry_index(frame);
        let entry = &mut inner.frames[index];
        entry.state_key = Some(state_key.clone());
        entry.group_key = group_key.map(str::to_string);

        tracing::info!(state_key = %state_key, "Registered frame");

        inner.restore_navigation(index, frame)
    }

    /// Forget `frame` and drop its session state.
    ///
    /// Entries for frames that no longer exist are pruned as well.
    /// Returns whether the frame was registered.
    pub fn unregister_frame(&self, frame: &FrameRef) -> bool {
        let mut inner = self.inner.lock();

        let state_key = inner
            .position(frame)
            .and_then(|index| inner.frames[index].state_key.clone());
        if let Some(key) = &state_key {
            inner.session.remove(key);
        }

        let before = inner.frames.len();
        inner
            .frames
            .retain(|entry| entry.is_alive() && !entry.refers_to(frame));
        let removed = before - inner.frames.len();

        tracing::info!(
            state_key = ?state_key,
            removed_entries = removed,
            "Unregistered frame"
        );

        state_key.is_some()
    }

    pub fn is_registered(&self, frame: &FrameRef) -> bool {
        let inner = self.inner.lock();
        inner
            .position(frame)
            .is_some_and(|index| inner.frames[index].is_registered())
    }

    /// Number of registered frames that still exist
    pub fn registered_frame_count(&self) -> usize {
        self.inner.lock().registered_frames().len()
    }

    /// Copy of the frame's state, creating it on first access.
    ///
    /// Registered frames read from session state under their key; others get
    /// transient state kept only by this store.
    pub fn state_for_frame(&self, frame: &FrameRef) -> Result<StateMap> {
        self.with_frame_state(frame, |state| state.clone())
    }

    /// Run `f` against the frame's state, creating it on first access
    pub fn with_frame_state<F, T>(&self, frame: &FrameRef, f: F) -> Result<T>
    where
        F: FnOnce(&mut StateMap) -> T,
    {
        let mut inner = self.inner.lock();
        let index = inner.entry_index(frame);
        Ok(f(inner.frame_state_mut(index)?))
    }

    // Persistence

    /// Capture navigation for every registered frame and write the session
    /// snapshot to the state file.
    ///
    /// The snapshot is encoded before the write starts; changes made while
    /// the write is pending are not part of it. On failure the in-memory
    /// state is left as it was.
    pub async fn save(&self) -> Result<()> {
        let _guard = self.begin_io()?;

        let (bytes, entries) = {
            let mut inner = self.inner.lock();
            for (index, frame) in inner.registered_frames() {
                inner.capture_navigation(index, &frame)?;
            }

            self.known_types.read().check(&inner.session)?;
            let bytes = SnapshotEnvelope::wrap(&inner.session)
                .and_then(|envelope| envelope.to_bytes())
                .map_err(PersistenceError::from)?;
            (bytes, inner.session.len())
        };

        if let Err(e) = self.state_file.write_atomic(&bytes).await {
            tracing::error!(path = %self.state_file.path().display(), "Failed to save session state: {}", e);
            return Err(PersistenceError::from(e).into());
        }

        tracing::info!(
            path = %self.state_file.path().display(),
            entries,
            bytes = bytes.len(),
            "Saved session state"
        );

        Ok(())
    }

    /// Replace session state with the saved snapshot and restore navigation
    /// for the registered frames in `group_key` (`None` for frames registered
    /// without a group).
    ///
    /// Session state is emptied first and stays empty if the snapshot is
    /// missing or cannot be decoded.
    pub async fn restore(&self, group_key: Option<&str>) -> Result<()> {
        let _guard = self.begin_io()?;

        self.inner.lock().session = StateMap::new();

        let session = match self.load_snapshot().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(path = %self.state_file.path().display(), "Failed to restore session state: {}", e);
                return Err(e.into());
            }
        };

        let group_key = group_key.filter(|g| !g.is_empty());
        let mut inner = self.inner.lock();
        inner.session = session;

        let mut restored_frames = 0;
        for (index, frame) in inner.registered_frames() {
            if inner.frames[index].group_key.as_deref() != group_key {
                continue;
            }

            inner.frames[index].materialized = false;
            if let Err(e) = inner.restore_navigation(index, &frame) {
                tracing::warn!("Skipping frame navigation restore: {}", e);
                continue;
            }
            restored_frames += 1;
        }

        tracing::info!(
            entries = inner.session.len(),
            restored_frames,
            group_key = ?group_key,
            "Restored session state"
        );

        Ok(())
    }

    /// Drop all session state and frame registrations
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.session.clear();
        inner.frames.clear();
    }

    async fn load_snapshot(&self) -> std::result::Result<StateMap, PersistenceError> {
        let bytes = self.state_file.read().await?;
        let session: StateMap = SnapshotEnvelope::from_bytes(&bytes)?.into_payload()?;
        self.known_types.read().check(&session)?;
        Ok(session)
    }

    fn begin_io(&self) -> Result<IoGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }

        Ok(IoGuard(Arc::clone(&self.in_flight)))
    }
}

impl Clone for SessionStateStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            known_types: Arc::clone(&self.known_types),
            state_file: self.state_file.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavigationStateError;
    use crate::value::CustomValue;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    /// Frame whose navigation state is just a list of page names
    struct PagesFrame {
        pages: Vec<String>,
    }

    impl NavigationFrame for PagesFrame {
        fn navigation_state(&self) -> String {
            self.pages.join(",")
        }

        fn set_navigation_state(&mut self, state: &str) -> std::result::Result<(), NavigationStateError> {
            if state.contains(' ') {
                return Err(NavigationStateError(state.to_string()));
            }
            self.pages = state.split(',').map(str::to_string).collect();
            Ok(())
        }

        fn back_stack_depth(&self) -> usize {
            self.pages.len().saturating_sub(1)
        }

        fn can_go_back(&self) -> bool {
            self.pages.len() > 1
        }

        fn can_go_forward(&self) -> bool {
            false
        }

        fn go_back(&mut self) -> bool {
            self.can_go_back() && self.pages.pop().is_some()
        }

        fn go_forward(&mut self) -> bool {
            false
        }
    }

    fn pages_frame(pages: &[&str]) -> FrameRef {
        Arc::new(Mutex::new(PagesFrame {
            pages: pages.iter().map(|p| p.to_string()).collect(),
        }))
    }

    fn store_in(dir: &TempDir) -> SessionStateStore {
        SessionStateStore::new(StateFile::in_dir(dir.path()))
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Highscore {
        name: String,
        points: u32,
    }

    impl KnownType for Highscore {
        const KIND: &'static str = "highscore";
    }

    #[tokio::test]
    async fn test_save_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.register_known_type::<Highscore>();

        let mut nested = StateMap::new();
        nested.insert("humans".to_string(), 14.into());
        nested.insert("ratio".to_string(), 0.25.into());
        store.insert("player", "Ada");
        store.insert("muted", true);
        store.insert("stats", nested);
        store.insert("empty", StateValue::Null);
        store.insert(
            "best",
            StateValue::custom(&Highscore {
                name: "Ada".to_string(),
                points: 900,
            })
            .unwrap(),
        );
        let before = store.session_state();

        store.save().await.unwrap();
        store.insert("player", "changed after save");

        let restored = store_in(&dir);
        restored.register_known_type::<Highscore>();
        restored.restore(None).await.unwrap();

        assert_eq!(restored.session_state(), before);
        assert_eq!(
            restored.get("best").unwrap().as_custom::<Highscore>(),
            Some(Highscore {
                name: "Ada".to_string(),
                points: 900
            })
        );
    }

    #[tokio::test]
    async fn test_restore_missing_file_leaves_state_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert("stale", 1);

        let result = store.restore(None).await;

        assert!(matches!(result, Err(SessionError::Persistence(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_restore_corrupt_file_leaves_state_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert("score", 10);
        store.save().await.unwrap();

        std::fs::write(store.state_file().path(), b"{\"version\": 1, \"trunc").unwrap();
        store.insert("score", 11);

        assert!(store.restore(None).await.is_err());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_restore_rejects_unregistered_kind() {
        let dir = TempDir::new().unwrap();
        let writer = store_in(&dir);
        writer.register_known_type::<Highscore>();
        writer.insert(
            "best",
            StateValue::custom(&Highscore {
                name: "Bo".to_string(),
                points: 3,
            })
            .unwrap(),
        );
        writer.save().await.unwrap();

        let reader = store_in(&dir);
        match reader.restore(None).await {
            Err(SessionError::Persistence(PersistenceError::UnknownKind(kind))) => {
                assert_eq!(kind, "highscore")
            }
            other => panic!("Expected UnknownKind, got {:?}", other),
        }
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_save_rejects_unregistered_kind_and_keeps_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert(
            "mystery",
            StateValue::Custom(CustomValue {
                kind: "mystery".to_string(),
                payload: serde_json::json!(1),
            }),
        );

        assert!(matches!(
            store.save().await,
            Err(SessionError::Persistence(PersistenceError::UnknownKind(_)))
        ));
        assert!(store.contains_key("mystery"));
        assert!(!store.state_file().exists().await);
    }

    #[tokio::test]
    async fn test_save_captures_frame_navigation() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["MainPage"]);
        store.register_frame(&frame, "AppFrame", None).unwrap();

        frame
            .lock()
            .set_navigation_state("MainPage,DetailPage")
            .unwrap();
        store.save().await.unwrap();

        let state = store.state_for_frame(&frame).unwrap();
        assert_eq!(
            state.get(NAVIGATION_STATE_KEY),
            Some(&StateValue::Text("MainPage,DetailPage".to_string()))
        );
        assert!(store.get("AppFrame").unwrap().as_map().is_some());
    }

    #[tokio::test]
    async fn test_register_after_restore_applies_navigation() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["MainPage", "GamePage"]);
        store.register_frame(&frame, "AppFrame", None).unwrap();
        store.save().await.unwrap();

        // Fresh process: restore first, register later
        let resumed = store_in(&dir);
        resumed.restore(None).await.unwrap();
        let new_frame = pages_frame(&[]);
        resumed.register_frame(&new_frame, "AppFrame", None).unwrap();

        let pages = new_frame.lock().navigation_state();
        assert_eq!(pages, "MainPage,GamePage");
    }

    #[tokio::test]
    async fn test_restore_applies_navigation_to_group_only() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let main = pages_frame(&["A", "B"]);
        let second = pages_frame(&["X", "Y"]);
        store.register_frame(&main, "AppFrame", None).unwrap();
        store.register_frame(&second, "AppFrame", Some("Window2")).unwrap();
        store.save().await.unwrap();

        main.lock().set_navigation_state("A").unwrap();
        second.lock().set_navigation_state("X").unwrap();

        store.restore(Some("Window2")).await.unwrap();
        assert_eq!(second.lock().navigation_state(), "X,Y");
        assert_eq!(main.lock().navigation_state(), "A");

        store.restore(None).await.unwrap();
        assert_eq!(main.lock().navigation_state(), "A,B");
        assert!(store.contains_key("Window2_AppFrame"));
    }

    #[test]
    fn test_double_registration_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["MainPage"]);
        store.register_frame(&frame, "AppFrame", None).unwrap();
        store
            .with_frame_state(&frame, |state| state.insert("Page-0".to_string(), 1.into()))
            .unwrap();

        let result = store.register_frame(&frame, "Other", None);

        assert!(matches!(result, Err(SessionError::InvalidOperation(_))));
        assert!(store.contains_key("AppFrame"));
        assert!(!store.contains_key("Other"));
        assert!(store.state_for_frame(&frame).unwrap().contains_key("Page-0"));
    }

    #[test]
    fn test_register_after_state_access_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["MainPage"]);
        store.state_for_frame(&frame).unwrap();

        assert!(matches!(
            store.register_frame(&frame, "AppFrame", None),
            Err(SessionError::InvalidOperation(_))
        ));
        assert!(!store.is_registered(&frame));
    }

    #[test]
    fn test_unregistered_frame_state_is_transient() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["MainPage"]);

        store
            .with_frame_state(&frame, |state| state.insert("Page-0".to_string(), "x".into()))
            .unwrap();

        assert!(store.is_empty());
        assert_eq!(store.state_for_frame(&frame).unwrap().len(), 1);
    }

    #[test]
    fn test_frame_state_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert("AppFrame", "not a map");
        let frame = pages_frame(&["MainPage"]);

        assert!(matches!(
            store.register_frame(&frame, "AppFrame", None),
            Err(SessionError::FrameStateType(_))
        ));
        assert!(!store.is_registered(&frame));
    }

    #[test]
    fn test_unregister_prunes_dead_frames() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let kept = pages_frame(&["A"]);
        let dropped = pages_frame(&["B"]);
        let leaving = pages_frame(&["C"]);
        store.register_frame(&kept, "Kept", None).unwrap();
        store.register_frame(&dropped, "Dropped", None).unwrap();
        store.register_frame(&leaving, "Leaving", None).unwrap();
        assert_eq!(store.registered_frame_count(), 3);

        drop(dropped);
        assert!(store.unregister_frame(&leaving));

        assert_eq!(store.inner.lock().frames.len(), 1);
        assert!(store.is_registered(&kept));
        assert!(!store.contains_key("Leaving"));
        // Only the unregistered frame's state is removed
        assert!(store.contains_key("Dropped"));
    }

    #[tokio::test]
    async fn test_concurrent_io_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let guard = store.begin_io().unwrap();
        assert!(matches!(store.save().await, Err(SessionError::Busy)));
        assert!(matches!(
            store.clone().restore(None).await,
            Err(SessionError::Busy)
        ));
        drop(guard);

        store.save().await.unwrap();
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let frame = pages_frame(&["A"]);
        store.register_frame(&frame, "AppFrame", None).unwrap();
        store.insert("k", 1);

        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.registered_frame_count(), 0);
        store.register_frame(&frame, "AppFrame", None).unwrap();
    }
}

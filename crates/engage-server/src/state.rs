use engage_core::{EngageError, Store};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Committed change pushed to `/api/events` subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardEvent {
    ProjectsChanged,
    ItemsChanged { project_id: String },
    EpicsChanged { project_id: String },
    SprintsChanged { project_id: String },
    TasksChanged { project_id: String },
    CollectionsChanged,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub event_tx: broadcast::Sender<BoardEvent>,
    store: Arc<Mutex<Option<Arc<Store>>>>,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            root,
            event_tx: tx,
            store: Arc::new(Mutex::new(None)),
        }
    }

    /// The workspace store, opened on first use. Blocking: call from
    /// `spawn_blocking`.
    pub fn store(&self) -> Result<Arc<Store>, EngageError> {
        let mut slot = self
            .store
            .lock()
            .map_err(|_| EngageError::Store("store handle lock poisoned".into()))?;
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(Store::open_workspace(&self.root)?);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Broadcast `events`. Having no subscribers is not an error.
    pub fn notify(&self, events: impl IntoIterator<Item = BoardEvent>) {
        for event in events {
            tracing::debug!(?event, "board event");
            let _ = self.event_tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_stores_root() {
        let state = AppState::new(PathBuf::from("/tmp/engage-test"));
        assert_eq!(state.root, PathBuf::from("/tmp/engage-test"));
    }

    #[test]
    fn store_requires_initialized_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = AppState::new(dir.path().to_path_buf());
        assert!(matches!(state.store(), Err(EngageError::NotInitialized)));
    }

    #[test]
    fn store_is_opened_once() {
        let dir = tempfile::TempDir::new().unwrap();
        engage_core::config::Config::new("t").save(dir.path()).unwrap();
        let state = AppState::new(dir.path().to_path_buf());
        let a = state.store().unwrap();
        let b = state.clone().store().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let e = BoardEvent::ItemsChanged {
            project_id: "p1".into(),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "items_changed");
        assert_eq!(v["project_id"], "p1");

        let mut rx = {
            let state = AppState::new(PathBuf::from("/tmp"));
            let rx = state.event_tx.subscribe();
            state.notify([BoardEvent::ProjectsChanged]);
            rx
        };
        assert_eq!(rx.try_recv().unwrap(), BoardEvent::ProjectsChanged);
    }
}

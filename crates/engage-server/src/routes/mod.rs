pub mod board;
pub mod collections;
pub mod config;
pub mod epics;
pub mod events;
pub mod items;
pub mod projects;
pub mod sprints;
pub mod tasks;

use engage_core::{project, EngageError, Store};

use crate::error::AppError;
use crate::state::AppState;

/// Run store work on the blocking pool with the workspace store.
pub(crate) async fn blocking<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, EngageError> + Send + 'static,
{
    let app = app.clone();
    let value = tokio::task::spawn_blocking(move || {
        let store = app.store()?;
        f(&store)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(value)
}

/// Resolve a `{project}` path segment (id or key) to a project id.
pub(crate) fn project_id(store: &Store, id_or_key: &str) -> Result<String, EngageError> {
    Ok(project::find_project(store, id_or_key)?.id)
}

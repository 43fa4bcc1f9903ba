use axum::extract::{Path, Query, State};
use axum::Json;
use engage_core::task::{self, Task};
use engage_core::types::ItemStatus;
use serde::Deserialize;

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub sprint_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MoveTaskBody {
    pub status: String,
    pub index: usize,
}

/// GET /api/projects/{project}/tasks?sprint_id=
pub async fn list_tasks(
    State(app): State<AppState>,
    Path(project): Path<String>,
    Query(q): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = blocking(&app, move |store| {
        task::list_tasks(store, &project_id(store, &project)?, q.sprint_id.as_deref())
    })
    .await?;
    Ok(Json(tasks))
}

/// POST /api/tasks/{id}/move: the backing item takes the same status.
pub async fn move_task(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MoveTaskBody>,
) -> Result<Json<Task>, AppError> {
    let moved = blocking(&app, move |store| {
        let status: ItemStatus = body.status.parse()?;
        task::move_task(store, &id, status, body.index)
    })
    .await?;
    app.notify([
        BoardEvent::TasksChanged {
            project_id: moved.project_id.clone(),
        },
        BoardEvent::ItemsChanged {
            project_id: moved.project_id.clone(),
        },
    ]);
    Ok(Json(moved))
}

use axum::extract::{Path, State};
use axum::Json;
use engage_core::backlog::{self, BacklogItem};
use engage_core::ordering::Board;
use engage_core::task::{self, Task};

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/projects/{project}/board: six columns of backlog items.
pub async fn get_board(
    State(app): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Board<BacklogItem>>, AppError> {
    let board = blocking(&app, move |store| {
        backlog::board(store, &project_id(store, &project)?)
    })
    .await?;
    Ok(Json(board))
}

/// GET /api/projects/{project}/task-board: six columns of sprint tasks.
pub async fn get_task_board(
    State(app): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Board<Task>>, AppError> {
    let board = blocking(&app, move |store| {
        task::task_board(store, &project_id(store, &project)?)
    })
    .await?;
    Ok(Json(board))
}

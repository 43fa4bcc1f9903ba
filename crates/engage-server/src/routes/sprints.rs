use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use engage_core::sprint::{self, NewSprint, Sprint};
use engage_core::task::Task;
use serde::Deserialize;

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct StartBody {
    /// Items to materialize, in task order. Defaults to every item currently
    /// scheduled into the sprint, in board order.
    pub item_ids: Option<Vec<String>>,
}

/// GET /api/projects/{project}/sprints
pub async fn list_sprints(
    State(app): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<Sprint>>, AppError> {
    let sprints = blocking(&app, move |store| {
        sprint::list_sprints(store, &project_id(store, &project)?)
    })
    .await?;
    Ok(Json(sprints))
}

/// POST /api/projects/{project}/sprints
pub async fn create_sprint(
    State(app): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<NewSprint>,
) -> Result<(StatusCode, Json<Sprint>), AppError> {
    let created = blocking(&app, move |store| {
        sprint::create_sprint(store, &project_id(store, &project)?, body)
    })
    .await?;
    app.notify([BoardEvent::SprintsChanged {
        project_id: created.project_id.clone(),
    }]);
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/sprints/{id}/start
pub async fn start_sprint(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StartBody>,
) -> Result<Json<Vec<Task>>, AppError> {
    let (project_id, tasks) = blocking(&app, move |store| {
        let s = sprint::load_sprint(store, &id)?;
        let ids = match body.item_ids {
            Some(ids) => ids,
            None => sprint::sprint_items(store, &s.id)?
                .into_iter()
                .map(|i| i.id)
                .collect(),
        };
        let tasks = sprint::start_sprint(store, &s.id, &s.project_id, &ids)?;
        Ok((s.project_id, tasks))
    })
    .await?;
    app.notify(lifecycle_events(project_id));
    Ok(Json(tasks))
}

/// POST /api/sprints/{id}/complete: 422 while any task is open.
pub async fn complete_sprint(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sprint>, AppError> {
    let done = blocking(&app, move |store| {
        let s = sprint::load_sprint(store, &id)?;
        sprint::complete_sprint(store, &s.id, &s.project_id)
    })
    .await?;
    app.notify(lifecycle_events(done.project_id.clone()));
    Ok(Json(done))
}

/// DELETE /api/sprints/{id}: items go back to the unscheduled backlog.
pub async fn delete_sprint(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (project_id, unassigned) = blocking(&app, move |store| {
        let s = sprint::load_sprint(store, &id)?;
        let n = sprint::delete_sprint(store, &s.id)?;
        Ok((s.project_id, n))
    })
    .await?;
    app.notify(lifecycle_events(project_id));
    Ok(Json(serde_json::json!({ "items_unassigned": unassigned })))
}

fn lifecycle_events(project_id: String) -> [BoardEvent; 3] {
    [
        BoardEvent::SprintsChanged {
            project_id: project_id.clone(),
        },
        BoardEvent::ItemsChanged {
            project_id: project_id.clone(),
        },
        BoardEvent::TasksChanged { project_id },
    ]
}

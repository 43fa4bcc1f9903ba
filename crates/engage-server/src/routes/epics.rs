use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use engage_core::epic::{self, Epic};
use serde::Deserialize;

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize)]
pub struct CreateEpicBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /api/projects/{project}/epics
pub async fn list_epics(
    State(app): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<Epic>>, AppError> {
    let epics = blocking(&app, move |store| {
        epic::list_epics(store, &project_id(store, &project)?)
    })
    .await?;
    Ok(Json(epics))
}

/// POST /api/projects/{project}/epics
pub async fn create_epic(
    State(app): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<CreateEpicBody>,
) -> Result<(StatusCode, Json<Epic>), AppError> {
    let created = blocking(&app, move |store| {
        let pid = project_id(store, &project)?;
        epic::create_epic(store, &pid, &body.title, body.description.as_deref())
    })
    .await?;
    app.notify([BoardEvent::EpicsChanged {
        project_id: created.project_id.clone(),
    }]);
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/epics/{id}: removes the epic's items and their tasks too.
pub async fn delete_epic(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (project_id, removed) = blocking(&app, move |store| {
        let e = epic::load_epic(store, &id)?;
        let removed = epic::delete_epic(store, &e.id)?;
        Ok((e.project_id, removed))
    })
    .await?;
    app.notify([
        BoardEvent::EpicsChanged {
            project_id: project_id.clone(),
        },
        BoardEvent::ItemsChanged {
            project_id: project_id.clone(),
        },
        BoardEvent::TasksChanged { project_id },
    ]);
    Ok(Json(serde_json::json!({ "items_removed": removed })))
}

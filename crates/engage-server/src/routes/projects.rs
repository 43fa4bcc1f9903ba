use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use engage_core::project::{self, Project};
use serde::Deserialize;

use super::blocking;
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub client: Option<String>,
}

/// GET /api/projects
pub async fn list_projects(State(app): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    let projects = blocking(&app, project::list_projects).await?;
    Ok(Json(projects))
}

/// POST /api/projects
pub async fn create_project(
    State(app): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let created = blocking(&app, move |store| {
        project::create_project(store, &body.name, &body.key, body.client.as_deref())
    })
    .await?;
    app.notify([BoardEvent::ProjectsChanged]);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/projects/{project}: by id or key.
pub async fn get_project(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let p = blocking(&app, move |store| project::find_project(store, &id)).await?;
    Ok(Json(p))
}

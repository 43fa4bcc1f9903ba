use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use engage_core::backlog::{self, BacklogItem, BacklogItemPatch, NewBacklogItem};
use engage_core::types::ItemStatus;
use serde::Deserialize;

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize)]
pub struct MoveBody {
    /// Destination column; wire form (`in_review`) or label (`In Review`).
    pub status: String,
    pub index: usize,
    /// When present, must be the item's project.
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignBody {
    #[serde(default)]
    pub sprint_id: Option<String>,
}

/// GET /api/projects/{project}/items: board order.
pub async fn list_items(
    State(app): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<Vec<BacklogItem>>, AppError> {
    let items = blocking(&app, move |store| {
        backlog::list_items(store, &project_id(store, &project)?)
    })
    .await?;
    Ok(Json(items))
}

/// POST /api/projects/{project}/items: appended to the end of its column.
pub async fn create_item(
    State(app): State<AppState>,
    Path(project): Path<String>,
    Json(body): Json<NewBacklogItem>,
) -> Result<(StatusCode, Json<BacklogItem>), AppError> {
    let item = blocking(&app, move |store| {
        backlog::create_item(store, &project_id(store, &project)?, body)
    })
    .await?;
    app.notify([BoardEvent::ItemsChanged {
        project_id: item.project_id.clone(),
    }]);
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/items/{id}: by id or `KEY-n` reference.
pub async fn get_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BacklogItem>, AppError> {
    let item = blocking(&app, move |store| backlog::find_item(store, &id)).await?;
    Ok(Json(item))
}

/// PATCH /api/items/{id}: by id or `KEY-n` reference, like every item route.
pub async fn update_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BacklogItemPatch>,
) -> Result<Json<BacklogItem>, AppError> {
    let item = blocking(&app, move |store| {
        let current = backlog::find_item(store, &id)?;
        backlog::update_item(store, &current.id, patch)
    })
    .await?;
    app.notify([BoardEvent::ItemsChanged {
        project_id: item.project_id.clone(),
    }]);
    Ok(Json(item))
}

/// POST /api/items/{id}/move
pub async fn move_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MoveBody>,
) -> Result<Json<BacklogItem>, AppError> {
    let moved = blocking(&app, move |store| {
        let status: ItemStatus = body.status.parse()?;
        let current = backlog::find_item(store, &id)?;
        backlog::move_item(
            store,
            &current.id,
            status,
            body.index,
            body.project_id.as_deref(),
        )
    })
    .await?;
    app.notify([BoardEvent::ItemsChanged {
        project_id: moved.project_id.clone(),
    }]);
    Ok(Json(moved))
}

/// POST /api/items/{id}/assign: `sprint_id: null` unschedules.
pub async fn assign_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<BacklogItem>, AppError> {
    let item = blocking(&app, move |store| {
        let current = backlog::find_item(store, &id)?;
        backlog::assign_sprint(store, &current.id, body.sprint_id.as_deref())
    })
    .await?;
    app.notify([
        BoardEvent::ItemsChanged {
            project_id: item.project_id.clone(),
        },
        BoardEvent::TasksChanged {
            project_id: item.project_id.clone(),
        },
    ]);
    Ok(Json(item))
}

/// DELETE /api/items/{id}
pub async fn delete_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let project_id = blocking(&app, move |store| {
        let item = backlog::find_item(store, &id)?;
        backlog::delete_item(store, &item.id)?;
        Ok(item.project_id)
    })
    .await?;
    app.notify([
        BoardEvent::ItemsChanged {
            project_id: project_id.clone(),
        },
        BoardEvent::TasksChanged { project_id },
    ]);
    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use engage_core::backlog::BacklogItem;
use engage_core::collection::{self, StoryCollection, UserStory};
use serde::Deserialize;

use super::{blocking, project_id};
use crate::error::AppError;
use crate::state::{AppState, BoardEvent};

#[derive(Deserialize)]
pub struct CreateCollectionBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stories: Vec<UserStory>,
}

#[derive(Deserialize)]
pub struct ImportBody {
    /// Project id or key.
    pub project: String,
    #[serde(default)]
    pub epic_id: Option<String>,
}

/// GET /api/collections
pub async fn list_collections(
    State(app): State<AppState>,
) -> Result<Json<Vec<StoryCollection>>, AppError> {
    let all = blocking(&app, collection::list_collections).await?;
    Ok(Json(all))
}

/// POST /api/collections: optionally seeded with stories.
pub async fn create_collection(
    State(app): State<AppState>,
    Json(body): Json<CreateCollectionBody>,
) -> Result<(StatusCode, Json<StoryCollection>), AppError> {
    let created = blocking(&app, move |store| {
        let mut c = collection::create_collection(store, &body.name, body.description.as_deref())?;
        for story in body.stories {
            c = collection::add_story(store, &c.id, story)?;
        }
        Ok(c)
    })
    .await?;
    app.notify([BoardEvent::CollectionsChanged]);
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/collections/{id}/import
pub async fn import_collection(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ImportBody>,
) -> Result<(StatusCode, Json<Vec<BacklogItem>>), AppError> {
    let (project_id, items) = blocking(&app, move |store| {
        let pid = project_id(store, &body.project)?;
        let items = collection::import_collection(store, &id, &pid, body.epic_id.as_deref())?;
        Ok((pid, items))
    })
    .await?;
    app.notify([BoardEvent::ItemsChanged { project_id }]);
    Ok((StatusCode::CREATED, Json(items)))
}

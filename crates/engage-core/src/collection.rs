//! Reusable story templates, imported into a project's backlog in bulk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backlog::{self, BacklogItem, NewBacklogItem};
use crate::error::{EngageError, Result};
use crate::project;
use crate::store::{Collection, Document, Store};
use crate::types::{ItemStatus, ItemType, Priority};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryCollection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stories: Vec<UserStory>,
    pub created_at: DateTime<Utc>,
}

impl Document for StoryCollection {
    const COLLECTION: Collection = Collection::Collections;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStory {
    pub title: String,
    pub description: Option<String>,
    pub points: u32,
    pub priority: Priority,
    pub item_type: ItemType,
}

impl UserStory {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn to_new_item(&self, epic_id: Option<&str>) -> NewBacklogItem {
        NewBacklogItem {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            points: self.points,
            item_type: self.item_type,
            epic_id: epic_id.map(str::to_string),
            status: ItemStatus::ToDo,
            ..NewBacklogItem::default()
        }
    }
}

pub fn create_collection(
    store: &Store,
    name: &str,
    description: Option<&str>,
) -> Result<StoryCollection> {
    if name.trim().is_empty() {
        return Err(EngageError::InvalidArgument("collection name is empty".into()));
    }
    let collection = StoryCollection {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        description: description.map(str::to_string),
        stories: Vec::new(),
        created_at: Utc::now(),
    };
    store.transaction(|txn| txn.put(&collection))?;
    tracing::info!(collection = %collection.id, name = %collection.name, "collection created");
    Ok(collection)
}

pub fn add_story(store: &Store, collection_id: &str, story: UserStory) -> Result<StoryCollection> {
    if story.title.trim().is_empty() {
        return Err(EngageError::InvalidArgument("story title is empty".into()));
    }
    store.transaction(|txn| {
        let mut collection = txn
            .get::<StoryCollection>(collection_id)?
            .ok_or_else(|| EngageError::CollectionNotFound(collection_id.to_string()))?;
        collection.stories.push(story.clone());
        txn.put(&collection)?;
        Ok(collection)
    })
}

pub fn list_collections(store: &Store) -> Result<Vec<StoryCollection>> {
    let mut collections = store.list::<StoryCollection>()?;
    collections.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(collections)
}

pub fn load_collection(store: &Store, id: &str) -> Result<StoryCollection> {
    store
        .get::<StoryCollection>(id)?
        .ok_or_else(|| EngageError::CollectionNotFound(id.to_string()))
}

/// Resolve a collection by document id or by name (case-insensitive).
pub fn find_collection(store: &Store, id_or_name: &str) -> Result<StoryCollection> {
    if let Some(c) = store.get::<StoryCollection>(id_or_name)? {
        return Ok(c);
    }
    store
        .list::<StoryCollection>()?
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(id_or_name.trim()))
        .ok_or_else(|| EngageError::CollectionNotFound(id_or_name.to_string()))
}

/// Create one `To Do` backlog item per story, in story order, optionally
/// under `epic_id`. Either every item is created or none is.
pub fn import_collection(
    store: &Store,
    collection_id: &str,
    project_id: &str,
    epic_id: Option<&str>,
) -> Result<Vec<BacklogItem>> {
    let items = store.transaction(|txn| {
        let collection = txn
            .get::<StoryCollection>(collection_id)?
            .ok_or_else(|| EngageError::CollectionNotFound(collection_id.to_string()))?;
        let mut project = project::load_in(txn, project_id)?;
        let mut items = Vec::with_capacity(collection.stories.len());
        for story in &collection.stories {
            items.push(backlog::create_in(txn, &mut project, story.to_new_item(epic_id))?);
        }
        project::touch(txn, &mut project)?;
        Ok(items)
    })?;
    tracing::info!(
        collection = %collection_id,
        project = %project_id,
        items = items.len(),
        "collection imported"
    );
    Ok(items)
}

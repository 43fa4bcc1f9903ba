use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backlog::{self, BacklogItem};
use crate::error::{EngageError, Result};
use crate::project;
use crate::store::{Collection, Document, Store};

/// A theme grouping backlog items. Items point at their epic via `epic_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub project_id: String,
    /// Sequential per project, like backlog numbers.
    pub epic_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document for Epic {
    const COLLECTION: Collection = Collection::Epics;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }
}

pub fn create_epic(
    store: &Store,
    project_id: &str,
    title: &str,
    description: Option<&str>,
) -> Result<Epic> {
    if title.trim().is_empty() {
        return Err(EngageError::InvalidArgument("epic title is empty".into()));
    }
    let epic = store.transaction(|txn| {
        let mut project = project::load_in(txn, project_id)?;
        let epic = Epic {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            epic_id: project.next_epic_id,
            title: title.trim().to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        project.next_epic_id += 1;
        txn.put(&epic)?;
        project::touch(txn, &mut project)?;
        Ok(epic)
    })?;
    tracing::info!(epic = %epic.id, epic_id = epic.epic_id, "epic created");
    Ok(epic)
}

pub fn list_epics(store: &Store, project_id: &str) -> Result<Vec<Epic>> {
    project::load_project(store, project_id)?;
    let mut epics = store.query_project::<Epic>(project_id)?;
    epics.sort_by_key(|e| e.epic_id);
    Ok(epics)
}

pub fn load_epic(store: &Store, id: &str) -> Result<Epic> {
    store
        .get::<Epic>(id)?
        .ok_or_else(|| EngageError::EpicNotFound(id.to_string()))
}

/// Resolve an epic of `project_id` by document id or by its number.
pub fn find_epic(store: &Store, project_id: &str, id_or_number: &str) -> Result<Epic> {
    if let Some(epic) = store.get::<Epic>(id_or_number)? {
        if epic.project_id == project_id {
            return Ok(epic);
        }
    }
    let number = id_or_number.trim().trim_start_matches('#').parse::<u32>().ok();
    store
        .query_project::<Epic>(project_id)?
        .into_iter()
        .find(|e| Some(e.epic_id) == number)
        .ok_or_else(|| EngageError::EpicNotFound(id_or_number.to_string()))
}

/// Delete an epic together with its backlog items and their tasks.
/// Returns how many items went with it.
pub fn delete_epic(store: &Store, id: &str) -> Result<usize> {
    let removed = store.transaction(|txn| {
        let epic = txn
            .get::<Epic>(id)?
            .ok_or_else(|| EngageError::EpicNotFound(id.to_string()))?;
        let mut project = project::load_in(txn, &epic.project_id)?;
        let ids: HashSet<String> = txn
            .query_project::<BacklogItem>(&project.id)?
            .into_iter()
            .filter(|i| i.epic_id.as_deref() == Some(id))
            .map(|i| i.id)
            .collect();
        let removed = backlog::remove_in(txn, &project.id, &ids)?;
        txn.delete::<Epic>(id);
        project::touch(txn, &mut project)?;
        Ok(removed)
    })?;
    tracing::info!(epic = %id, items = removed, "epic deleted");
    Ok(removed)
}

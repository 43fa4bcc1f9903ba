//! Backlog items and the move engine.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::epic::Epic;
use crate::error::{EngageError, Result};
use crate::ordering::{self, Board, Ordered};
use crate::project::{self, Project};
use crate::sprint::Sprint;
use crate::store::{Collection, Document, Store, Txn};
use crate::task;
use crate::types::{ItemStatus, ItemType, Priority, SprintStatus};

// ---------------------------------------------------------------------------
// BacklogItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: String,
    pub project_id: String,
    /// Sequential per project, assigned once.
    pub backlog_id: u32,
    pub epic_id: Option<String>,
    pub sprint_id: Option<String>,
    pub status: ItemStatus,
    /// Position within the `(project_id, status)` column.
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub item_type: ItemType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for BacklogItem {
    const COLLECTION: Collection = Collection::Items;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }
}

impl Ordered for BacklogItem {
    fn key(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ItemStatus {
        self.status
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_position(&mut self, status: ItemStatus, order: u32) {
        self.status = status;
        self.order = order;
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Fields for a new item. Everything but `title` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewBacklogItem {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub owner: Option<String>,
    pub owner_avatar: Option<String>,
    pub points: u32,
    pub due_date: Option<NaiveDate>,
    pub item_type: ItemType,
    pub epic_id: Option<String>,
    pub sprint_id: Option<String>,
    pub status: ItemStatus,
}

impl NewBacklogItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Edits to non-ordering fields. `None` leaves a field alone; for the
/// nullable fields `Some(None)` clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklogItemPatch {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(deserialize_with = "double_option")]
    pub owner: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub owner_avatar: Option<Option<String>>,
    pub points: Option<u32>,
    #[serde(deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    pub item_type: Option<ItemType>,
    #[serde(deserialize_with = "double_option")]
    pub epic_id: Option<Option<String>>,
}

/// Distinguish an explicit `null` (clear) from an absent field (keep).
fn double_option<'de, D, T>(d: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn load_item(store: &Store, id: &str) -> Result<BacklogItem> {
    store
        .get::<BacklogItem>(id)?
        .ok_or_else(|| EngageError::ItemNotFound(id.to_string()))
}

/// Resolve an item by document id or by its `KEY-n` reference.
pub fn find_item(store: &Store, id_or_ref: &str) -> Result<BacklogItem> {
    if let Some(item) = store.get::<BacklogItem>(id_or_ref)? {
        return Ok(item);
    }
    let not_found = || EngageError::ItemNotFound(id_or_ref.to_string());
    let (key, number) = id_or_ref.rsplit_once('-').ok_or_else(not_found)?;
    let number: u32 = number.parse().map_err(|_| not_found())?;
    let project = project::find_project(store, key).map_err(|_| not_found())?;
    store
        .query_project::<BacklogItem>(&project.id)?
        .into_iter()
        .find(|i| i.backlog_id == number)
        .ok_or_else(not_found)
}

/// All items of a project in board order (status, then order).
pub fn list_items(store: &Store, project_id: &str) -> Result<Vec<BacklogItem>> {
    project::load_project(store, project_id)?;
    let mut items = store.query_project::<BacklogItem>(project_id)?;
    items.sort_by(|a, b| (a.status, a.order).cmp(&(b.status, b.order)));
    Ok(items)
}

pub fn board(store: &Store, project_id: &str) -> Result<Board<BacklogItem>> {
    let items = list_items(store, project_id)?;
    Ok(Board::from_items(&items))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

pub fn create_item(store: &Store, project_id: &str, new: NewBacklogItem) -> Result<BacklogItem> {
    let item = store.transaction(|txn| {
        let mut project = project::load_in(txn, project_id)?;
        let item = create_in(txn, &mut project, new.clone())?;
        project::touch(txn, &mut project)?;
        Ok(item)
    })?;
    tracing::info!(item = %item.id, backlog_id = item.backlog_id, "backlog item created");
    Ok(item)
}

/// Create one item inside an open transaction, appended to the end of its
/// status column. The caller touches the project.
pub(crate) fn create_in(
    txn: &mut Txn,
    project: &mut Project,
    new: NewBacklogItem,
) -> Result<BacklogItem> {
    if new.title.trim().is_empty() {
        return Err(EngageError::InvalidArgument("item title is empty".into()));
    }
    if let Some(epic_id) = &new.epic_id {
        check_epic(txn, &project.id, epic_id)?;
    }
    if let Some(sprint_id) = &new.sprint_id {
        check_sprint(txn, &project.id, sprint_id)?;
    }

    let order = txn
        .query_project::<BacklogItem>(&project.id)?
        .iter()
        .filter(|i| i.status == new.status)
        .count() as u32;

    let now = Utc::now();
    let item = BacklogItem {
        id: Uuid::new_v4().to_string(),
        project_id: project.id.clone(),
        backlog_id: project.next_backlog_id,
        epic_id: new.epic_id,
        sprint_id: new.sprint_id,
        status: new.status,
        order,
        title: new.title.trim().to_string(),
        description: new.description,
        priority: new.priority,
        owner: new.owner,
        owner_avatar: new.owner_avatar,
        points: new.points,
        due_date: new.due_date,
        item_type: new.item_type,
        created_at: now,
        updated_at: now,
    };
    project.next_backlog_id += 1;
    txn.put(&item)?;
    Ok(item)
}

pub fn update_item(store: &Store, id: &str, patch: BacklogItemPatch) -> Result<BacklogItem> {
    store.transaction(|txn| {
        let mut item = load_in(txn, id)?;
        let patch = patch.clone();
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(EngageError::InvalidArgument("item title is empty".into()));
            }
            item.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(priority) = patch.priority {
            item.priority = priority;
        }
        if let Some(owner) = patch.owner {
            item.owner = owner;
        }
        if let Some(avatar) = patch.owner_avatar {
            item.owner_avatar = avatar;
        }
        if let Some(points) = patch.points {
            item.points = points;
        }
        if let Some(due) = patch.due_date {
            item.due_date = due;
        }
        if let Some(item_type) = patch.item_type {
            item.item_type = item_type;
        }
        if let Some(epic_id) = patch.epic_id {
            if let Some(e) = &epic_id {
                check_epic(txn, &item.project_id, e)?;
            }
            item.epic_id = epic_id;
        }
        item.updated_at = Utc::now();
        txn.put(&item)?;
        let mut project = project::load_in(txn, &item.project_id)?;
        project::touch(txn, &mut project)?;
        Ok(item)
    })
}

/// Schedule an item into a sprint, or back into the unscheduled backlog.
pub fn assign_sprint(store: &Store, id: &str, sprint_id: Option<&str>) -> Result<BacklogItem> {
    store.transaction(|txn| {
        let mut item = load_in(txn, id)?;
        if let Some(s) = sprint_id {
            check_sprint(txn, &item.project_id, s)?;
        }
        let leaving = item.sprint_id.is_some() && item.sprint_id.as_deref() != sprint_id;
        item.sprint_id = sprint_id.map(str::to_string);
        item.updated_at = Utc::now();
        txn.put(&item)?;
        if leaving {
            // The task belonged to the sprint the item just left.
            let ids: HashSet<String> = [item.id.clone()].into_iter().collect();
            task::remove_for_items(txn, &item.project_id, &ids)?;
        }
        let mut project = project::load_in(txn, &item.project_id)?;
        project::touch(txn, &mut project)?;
        Ok(item)
    })
}

/// Delete an item and its execution records, closing the gaps they leave.
pub fn delete_item(store: &Store, id: &str) -> Result<()> {
    store.transaction(|txn| {
        let item = load_in(txn, id)?;
        let ids: HashSet<String> = [item.id.clone()].into_iter().collect();
        remove_in(txn, &item.project_id, &ids)?;
        let mut project = project::load_in(txn, &item.project_id)?;
        project::touch(txn, &mut project)
    })?;
    tracing::info!(item = %id, "backlog item deleted");
    Ok(())
}

/// Remove `ids` from the project and compact every affected column.
/// Returns how many items were removed.
pub(crate) fn remove_in(txn: &mut Txn, project_id: &str, ids: &HashSet<String>) -> Result<usize> {
    let (gone, kept): (Vec<BacklogItem>, Vec<BacklogItem>) = txn
        .query_project::<BacklogItem>(project_id)?
        .into_iter()
        .partition(|i| ids.contains(&i.id));
    for item in &gone {
        txn.delete::<BacklogItem>(&item.id);
    }
    for item in ordering::compact_all(&kept) {
        txn.put(&item)?;
    }
    task::remove_for_items(txn, project_id, ids)?;
    Ok(gone.len())
}

// ---------------------------------------------------------------------------
// Move engine
// ---------------------------------------------------------------------------

/// Move `item_id` to `destination` at `index`, renumbering both columns.
///
/// The whole project's items are read inside the transaction, so the plan is
/// computed from the same snapshot that commit validates. `index` counts
/// positions in the destination column after the item has left it and must
/// be within `0..=len`. When `project_id` is given it must be the item's
/// project.
pub fn move_item(
    store: &Store,
    item_id: &str,
    destination: ItemStatus,
    index: usize,
    project_id: Option<&str>,
) -> Result<BacklogItem> {
    let moved = store.transaction(|txn| {
        let item = load_in(txn, item_id)?;
        if let Some(p) = project_id {
            if p != item.project_id {
                return Err(EngageError::InvalidArgument(format!(
                    "item {item_id} does not belong to project {p}"
                )));
            }
        }
        let mut project = match txn.get::<Project>(&item.project_id)? {
            Some(p) => p,
            None => {
                return Err(EngageError::InvalidArgument(format!(
                    "project '{}' for item {item_id} cannot be resolved",
                    item.project_id
                )))
            }
        };

        let items = txn.query_project::<BacklogItem>(&item.project_id)?;
        let plan = ordering::plan_move(&items, &item, destination, index)?;

        let now = Utc::now();
        let mut moved = item.clone();
        for mut changed in plan {
            changed.updated_at = now;
            if changed.id == item.id {
                moved = changed.clone();
            }
            txn.put(&changed)?;
        }
        project::touch(txn, &mut project)?;
        Ok(moved)
    })?;
    tracing::info!(
        item = %moved.id,
        status = %moved.status,
        order = moved.order,
        "backlog item moved"
    );
    Ok(moved)
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

pub(crate) fn load_in(txn: &mut Txn, id: &str) -> Result<BacklogItem> {
    txn.get::<BacklogItem>(id)?
        .ok_or_else(|| EngageError::ItemNotFound(id.to_string()))
}

fn check_epic(txn: &mut Txn, project_id: &str, epic_id: &str) -> Result<()> {
    match txn.get::<Epic>(epic_id)? {
        Some(e) if e.project_id == project_id => Ok(()),
        Some(_) => Err(EngageError::InvalidArgument(format!(
            "epic {epic_id} belongs to another project"
        ))),
        None => Err(EngageError::EpicNotFound(epic_id.to_string())),
    }
}

fn check_sprint(txn: &mut Txn, project_id: &str, sprint_id: &str) -> Result<()> {
    match txn.get::<Sprint>(sprint_id)? {
        Some(s) if s.project_id != project_id => Err(EngageError::InvalidArgument(format!(
            "sprint {sprint_id} belongs to another project"
        ))),
        Some(s) if s.status == SprintStatus::Completed => Err(EngageError::PreconditionFailed(
            format!("sprint '{}' is already completed", s.name),
        )),
        Some(_) => Ok(()),
        None => Err(EngageError::SprintNotFound(sprint_id.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Sprint execution records.
//!
//! Starting a sprint materializes one [`Task`] per scheduled backlog item.
//! Tasks live on their own board with the same `(project, status)` density
//! rule as backlog items; moving a task carries its status over to the
//! backing item.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backlog::{self, BacklogItem};
use crate::error::{EngageError, Result};
use crate::ordering::{self, Board, Ordered};
use crate::project;
use crate::store::{Collection, Document, Store, Txn};
use crate::types::{ItemStatus, ItemType, Priority};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub sprint_id: String,
    /// Document id of the backing backlog item.
    pub backlog_item_id: String,
    /// Human-facing number of the backing item.
    pub backlog_ref: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

impl Document for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }
}

impl Ordered for Task {
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

impl Task {
    /// A fresh `To Do` task mirroring `item`.
    pub fn from_item(item: &BacklogItem, sprint_id: &str, order: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: item.project_id.clone(),
            sprint_id: sprint_id.to_string(),
            backlog_item_id: item.id.clone(),
            backlog_ref: item.backlog_id,
            title: item.title.clone(),
            description: item.description.clone(),
            priority: item.priority,
            owner: item.owner.clone(),
            points: item.points,
            item_type: item.item_type,
            status: ItemStatus::ToDo,
            order,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Tasks of a project in board order, optionally limited to one sprint.
pub fn list_tasks(store: &Store, project_id: &str, sprint_id: Option<&str>) -> Result<Vec<Task>> {
    project::load_project(store, project_id)?;
    let mut tasks: Vec<Task> = store
        .query_project::<Task>(project_id)?
        .into_iter()
        .filter(|t| sprint_id.map_or(true, |s| t.sprint_id == s))
        .collect();
    tasks.sort_by(|a, b| (a.status, a.order).cmp(&(b.status, b.order)));
    Ok(tasks)
}

/// Resolve a task by document id or by the `KEY-n` reference of its item.
pub fn find_task(store: &Store, id_or_ref: &str) -> Result<Task> {
    if let Some(task) = store.get::<Task>(id_or_ref)? {
        return Ok(task);
    }
    let item = backlog::find_item(store, id_or_ref)
        .map_err(|_| EngageError::TaskNotFound(id_or_ref.to_string()))?;
    store
        .query_project::<Task>(&item.project_id)?
        .into_iter()
        .find(|t| t.backlog_item_id == item.id)
        .ok_or_else(|| EngageError::TaskNotFound(id_or_ref.to_string()))
}

pub fn task_board(store: &Store, project_id: &str) -> Result<Board<Task>> {
    Ok(Board::from_items(&list_tasks(store, project_id, None)?))
}

/// Move a task on the execution board. The backing backlog item takes the
/// new status too and is appended to the end of that column.
pub fn move_task(
    store: &Store,
    task_id: &str,
    destination: ItemStatus,
    index: usize,
) -> Result<Task> {
    let moved = store.transaction(|txn| {
        let task = txn
            .get::<Task>(task_id)?
            .ok_or_else(|| EngageError::TaskNotFound(task_id.to_string()))?;
        let mut project = project::load_in(txn, &task.project_id)?;

        let tasks = txn.query_project::<Task>(&task.project_id)?;
        let mut moved = task.clone();
        for changed in ordering::plan_move(&tasks, &task, destination, index)? {
            if changed.id == task.id {
                moved = changed.clone();
            }
            txn.put(&changed)?;
        }

        if let Some(item) = txn.get::<BacklogItem>(&task.backlog_item_id)? {
            if item.status != destination {
                let items = txn.query_project::<BacklogItem>(&item.project_id)?;
                let end = items.iter().filter(|i| i.status == destination).count();
                let now = Utc::now();
                for mut changed in ordering::plan_move(&items, &item, destination, end)? {
                    changed.updated_at = now;
                    txn.put(&changed)?;
                }
            }
        }

        project::touch(txn, &mut project)?;
        Ok(moved)
    })?;
    tracing::info!(task = %moved.id, status = %moved.status, order = moved.order, "task moved");
    Ok(moved)
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

/// Delete the tasks matching `pred` and compact what remains.
/// Returns the deleted tasks.
pub(crate) fn remove_where(
    txn: &mut Txn,
    project_id: &str,
    pred: impl Fn(&Task) -> bool,
) -> Result<Vec<Task>> {
    let (gone, kept): (Vec<Task>, Vec<Task>) = txn
        .query_project::<Task>(project_id)?
        .into_iter()
        .partition(|t| pred(t));
    for t in &gone {
        txn.delete::<Task>(&t.id);
    }
    for t in ordering::compact_all(&kept) {
        txn.put(&t)?;
    }
    Ok(gone)
}

/// Drop the tasks backed by any of `item_ids`.
pub(crate) fn remove_for_items(
    txn: &mut Txn,
    project_id: &str,
    item_ids: &HashSet<String>,
) -> Result<usize> {
    Ok(remove_where(txn, project_id, |t| item_ids.contains(&t.backlog_item_id))?.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::{create_item, list_items, NewBacklogItem};
    use crate::config::RetryPolicy;
    use crate::ordering::check_dense;
    use crate::project::create_project;
    use crate::sprint::{create_sprint, start_sprint, NewSprint};
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("t.redb"), RetryPolicy::default()).unwrap();
        (dir, store)
    }

    fn started(store: &Store) -> (String, Vec<BacklogItem>) {
        let p = create_project(store, "Acme", "ACME", None).unwrap();
        let sprint = create_sprint(store, &p.id, NewSprint::new("Wave 1")).unwrap();
        let items: Vec<BacklogItem> = ["A", "B", "C"]
            .iter()
            .map(|t| {
                let mut n = NewBacklogItem::new(*t);
                n.sprint_id = Some(sprint.id.clone());
                create_item(store, &p.id, n).unwrap()
            })
            .collect();
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        start_sprint(store, &sprint.id, &p.id, &ids).unwrap();
        (p.id, items)
    }

    #[test]
    fn move_task_mirrors_status_to_item() {
        let (_dir, store) = open_tmp();
        let (pid, items) = started(&store);
        let tasks = list_tasks(&store, &pid, None).unwrap();
        assert_eq!(tasks.len(), 3);
        let b = tasks.iter().find(|t| t.title == "B").unwrap();

        let moved = move_task(&store, &b.id, ItemStatus::InProgress, 0).unwrap();
        assert_eq!(moved.status, ItemStatus::InProgress);
        assert_eq!(moved.order, 0);

        let tasks = list_tasks(&store, &pid, None).unwrap();
        assert!(check_dense(&tasks).is_empty());
        let todo: Vec<&str> = tasks
            .iter()
            .filter(|t| t.status == ItemStatus::ToDo)
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(todo, vec!["A", "C"]);

        let all = list_items(&store, &pid).unwrap();
        assert!(check_dense(&all).is_empty());
        let item_b = all.iter().find(|i| i.id == items[1].id).unwrap();
        assert_eq!(item_b.status, ItemStatus::InProgress);
        assert_eq!(item_b.order, 0);
    }

    #[test]
    fn move_task_to_same_status_leaves_item_alone() {
        let (_dir, store) = open_tmp();
        let (pid, items) = started(&store);
        let tasks = list_tasks(&store, &pid, None).unwrap();
        let c = tasks.iter().find(|t| t.title == "C").unwrap();
        move_task(&store, &c.id, ItemStatus::ToDo, 0).unwrap();

        let titles: Vec<String> = task_board(&store, &pid)
            .unwrap()
            .column(ItemStatus::ToDo)
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        let item_c = backlog::load_item(&store, &items[2].id).unwrap();
        assert_eq!(item_c.order, 2);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let (_dir, store) = open_tmp();
        let err = move_task(&store, "nope", ItemStatus::Complete, 0).unwrap_err();
        assert!(matches!(err, EngageError::TaskNotFound(_)));
    }

    #[test]
    fn find_task_by_item_reference() {
        let (_dir, store) = open_tmp();
        let (_pid, items) = started(&store);
        let task = find_task(&store, "ACME-2").unwrap();
        assert_eq!(task.backlog_item_id, items[1].id);
        assert_eq!(find_task(&store, &task.id).unwrap(), task);
        assert!(matches!(
            find_task(&store, "ACME-7"),
            Err(EngageError::TaskNotFound(_))
        ));
    }
}

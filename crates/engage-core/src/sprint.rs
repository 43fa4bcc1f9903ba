//! Sprints ("waves") and their start / complete / delete batch operations.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backlog::{self, BacklogItem};
use crate::error::{EngageError, Result};
use crate::project::{self, Project};
use crate::store::{Collection, Document, Store, Txn};
use crate::task::{self, Task};
use crate::types::{ItemStatus, SprintStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Document for Sprint {
    const COLLECTION: Collection = Collection::Sprints;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSprint {
    pub name: String,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewSprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Basic operations
// ---------------------------------------------------------------------------

pub fn create_sprint(store: &Store, project_id: &str, new: NewSprint) -> Result<Sprint> {
    if new.name.trim().is_empty() {
        return Err(EngageError::InvalidArgument("sprint name is empty".into()));
    }
    if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
        if end < start {
            return Err(EngageError::InvalidArgument(format!(
                "sprint ends ({end}) before it starts ({start})"
            )));
        }
    }
    let sprint = store.transaction(|txn| {
        let mut project = project::load_in(txn, project_id)?;
        let sprint = Sprint {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            name: new.name.trim().to_string(),
            goal: new.goal.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            status: SprintStatus::NotStarted,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        txn.put(&sprint)?;
        project::touch(txn, &mut project)?;
        Ok(sprint)
    })?;
    tracing::info!(sprint = %sprint.id, name = %sprint.name, "sprint created");
    Ok(sprint)
}

pub fn load_sprint(store: &Store, id: &str) -> Result<Sprint> {
    store
        .get::<Sprint>(id)?
        .ok_or_else(|| EngageError::SprintNotFound(id.to_string()))
}

/// Resolve a sprint of `project_id` by document id or by name
/// (case-insensitive).
pub fn find_sprint(store: &Store, project_id: &str, id_or_name: &str) -> Result<Sprint> {
    if let Some(sprint) = store.get::<Sprint>(id_or_name)? {
        if sprint.project_id == project_id {
            return Ok(sprint);
        }
    }
    store
        .query_project::<Sprint>(project_id)?
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(id_or_name.trim()))
        .ok_or_else(|| EngageError::SprintNotFound(id_or_name.to_string()))
}

pub fn list_sprints(store: &Store, project_id: &str) -> Result<Vec<Sprint>> {
    project::load_project(store, project_id)?;
    let mut sprints = store.query_project::<Sprint>(project_id)?;
    sprints.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(sprints)
}

/// Backlog items currently scheduled into the sprint, in backlog board order.
pub fn sprint_items(store: &Store, sprint_id: &str) -> Result<Vec<BacklogItem>> {
    let sprint = load_sprint(store, sprint_id)?;
    let mut items: Vec<BacklogItem> = store
        .query_project::<BacklogItem>(&sprint.project_id)?
        .into_iter()
        .filter(|i| i.sprint_id.as_deref() == Some(sprint_id))
        .collect();
    items.sort_by(|a, b| (a.status, a.order).cmp(&(b.status, b.order)));
    Ok(items)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Start a sprint over `item_ids`.
///
/// Stale tasks from an earlier start of this sprint, or backed by any of the
/// given items, are removed first. One `To Do` task is then created per item,
/// in input order, appended after any `To Do` tasks other sprints still hold.
/// An empty item list is rejected and leaves the sprint untouched.
pub fn start_sprint(
    store: &Store,
    sprint_id: &str,
    project_id: &str,
    item_ids: &[String],
) -> Result<Vec<Task>> {
    let (sprint, tasks, stale) = store.transaction(|txn| {
        let mut sprint = load_scoped(txn, sprint_id, project_id)?;
        if item_ids.is_empty() {
            return Err(EngageError::PreconditionFailed(format!(
                "sprint '{}' has no backlog items to start",
                sprint.name
            )));
        }
        if sprint.status == SprintStatus::Completed {
            return Err(EngageError::PreconditionFailed(format!(
                "sprint '{}' is already completed",
                sprint.name
            )));
        }
        let mut project = project::load_in(txn, project_id)?;

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            if !seen.insert(id.as_str()) {
                return Err(EngageError::InvalidArgument(format!(
                    "item {id} listed twice"
                )));
            }
            let item = backlog::load_in(txn, id)?;
            if item.project_id != project.id {
                return Err(EngageError::InvalidArgument(format!(
                    "item {id} does not belong to project {project_id}"
                )));
            }
            items.push(item);
        }

        let refs: HashSet<u32> = items.iter().map(|i| i.backlog_id).collect();
        let stale = task::remove_where(txn, &project.id, |t| {
            t.sprint_id == sprint.id || refs.contains(&t.backlog_ref)
        })?;

        let base = txn
            .query_project::<Task>(&project.id)?
            .iter()
            .filter(|t| t.status == ItemStatus::ToDo)
            .count() as u32;

        let now = Utc::now();
        let mut tasks = Vec::with_capacity(items.len());
        for (pos, mut item) in items.into_iter().enumerate() {
            let task = Task::from_item(&item, &sprint.id, base + pos as u32);
            txn.put(&task)?;
            if item.sprint_id.as_deref() != Some(sprint.id.as_str()) {
                item.sprint_id = Some(sprint.id.clone());
                item.updated_at = now;
                txn.put(&item)?;
            }
            tasks.push(task);
        }

        sprint.status = SprintStatus::Active;
        sprint.started_at = Some(now);
        txn.put(&sprint)?;
        project::touch(txn, &mut project)?;
        Ok((sprint, tasks, stale.len()))
    })?;
    tracing::info!(
        sprint = %sprint.id,
        tasks = tasks.len(),
        stale,
        "sprint started"
    );
    Ok(tasks)
}

/// Complete a sprint once the tasks of every item still scheduled into it
/// are `Complete`, then drop those tasks.
///
/// If any such task is still open nothing is changed and the error names the
/// open tasks. Backlog items keep their status for reporting.
pub fn complete_sprint(store: &Store, sprint_id: &str, project_id: &str) -> Result<Sprint> {
    let sprint = store.transaction(|txn| {
        let mut sprint = load_scoped(txn, sprint_id, project_id)?;
        if sprint.status != SprintStatus::Active {
            return Err(EngageError::PreconditionFailed(format!(
                "sprint '{}' is {}, only an active sprint can be completed",
                sprint.name, sprint.status
            )));
        }
        let mut project = project::load_in(txn, project_id)?;

        let members: HashSet<String> = txn
            .query_project::<BacklogItem>(&project.id)?
            .into_iter()
            .filter(|i| i.sprint_id.as_deref() == Some(sprint.id.as_str()))
            .map(|i| i.id)
            .collect();
        let mut open: Vec<Task> = txn
            .query_project::<Task>(&project.id)?
            .into_iter()
            .filter(|t| members.contains(&t.backlog_item_id) && t.status != ItemStatus::Complete)
            .collect();
        if !open.is_empty() {
            open.sort_by_key(|t| t.backlog_ref);
            let list: Vec<String> = open
                .iter()
                .map(|t| format!("{} ({})", project.reference(t.backlog_ref), t.status))
                .collect();
            return Err(EngageError::PreconditionFailed(format!(
                "sprint '{}' has {} open task(s): {}",
                sprint.name,
                open.len(),
                list.join(", ")
            )));
        }

        task::remove_for_items(txn, &project.id, &members)?;
        sprint.status = SprintStatus::Completed;
        sprint.completed_at = Some(Utc::now());
        txn.put(&sprint)?;
        project::touch(txn, &mut project)?;
        Ok(sprint)
    })?;
    tracing::info!(sprint = %sprint.id, "sprint completed");
    Ok(sprint)
}

/// Delete a sprint. Its items go back to the unscheduled backlog and its
/// tasks are dropped, all in one commit. Returns how many items were
/// unassigned.
pub fn delete_sprint(store: &Store, sprint_id: &str) -> Result<usize> {
    let unassigned = store.transaction(|txn| {
        let sprint = txn
            .get::<Sprint>(sprint_id)?
            .ok_or_else(|| EngageError::SprintNotFound(sprint_id.to_string()))?;
        let mut project: Project = project::load_in(txn, &sprint.project_id)?;

        let now = Utc::now();
        let mut count = 0;
        for mut item in txn.query_project::<BacklogItem>(&project.id)? {
            if item.sprint_id.as_deref() == Some(sprint_id) {
                item.sprint_id = None;
                item.updated_at = now;
                txn.put(&item)?;
                count += 1;
            }
        }
        task::remove_where(txn, &project.id, |t| t.sprint_id == sprint_id)?;
        txn.delete::<Sprint>(sprint_id);
        project::touch(txn, &mut project)?;
        Ok(count)
    })?;
    tracing::info!(sprint = %sprint_id, unassigned, "sprint deleted");
    Ok(unassigned)
}

fn load_scoped(txn: &mut Txn, sprint_id: &str, project_id: &str) -> Result<Sprint> {
    let sprint = txn
        .get::<Sprint>(sprint_id)?
        .ok_or_else(|| EngageError::SprintNotFound(sprint_id.to_string()))?;
    if sprint.project_id != project_id {
        return Err(EngageError::InvalidArgument(format!(
            "sprint {sprint_id} does not belong to project {project_id}"
        )));
    }
    Ok(sprint)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::{assign_sprint, create_item, list_items, NewBacklogItem};
    use crate::config::RetryPolicy;
    use crate::ordering::check_dense;
    use crate::project::create_project;
    use crate::task::{list_tasks, move_task};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Store,
        project: String,
        sprint: String,
        items: Vec<String>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("t.redb"), RetryPolicy::default()).unwrap();
        let p = create_project(&store, "Acme", "ACME", None).unwrap();
        let sprint = create_sprint(&store, &p.id, NewSprint::new("Wave 1")).unwrap();
        let items = ["A", "B", "C"]
            .iter()
            .map(|t| {
                let mut n = NewBacklogItem::new(*t);
                n.sprint_id = Some(sprint.id.clone());
                n.points = 3;
                create_item(&store, &p.id, n).unwrap().id
            })
            .collect();
        Fixture {
            _dir: dir,
            store,
            project: p.id,
            sprint: sprint.id,
            items,
        }
    }

    fn finish_all(f: &Fixture) {
        for t in list_tasks(&f.store, &f.project, Some(&f.sprint)).unwrap() {
            move_task(&f.store, &t.id, ItemStatus::Complete, 0).unwrap();
        }
    }

    #[test]
    fn start_with_no_items_fails_and_keeps_status() {
        let f = fixture();
        let err = start_sprint(&f.store, &f.sprint, &f.project, &[]).unwrap_err();
        assert!(matches!(err, EngageError::PreconditionFailed(_)));
        let sprint = load_sprint(&f.store, &f.sprint).unwrap();
        assert_eq!(sprint.status, SprintStatus::NotStarted);
        assert!(list_tasks(&f.store, &f.project, None).unwrap().is_empty());
    }

    #[test]
    fn start_materializes_dense_todo_tasks() {
        let f = fixture();
        let tasks = start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        let orders: Vec<u32> = tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(tasks.iter().all(|t| t.status == ItemStatus::ToDo));
        let refs: Vec<u32> = tasks.iter().map(|t| t.backlog_ref).collect();
        assert_eq!(refs, vec![1, 2, 3]);
        assert_eq!(
            load_sprint(&f.store, &f.sprint).unwrap().status,
            SprintStatus::Active
        );
    }

    #[test]
    fn restart_replaces_stale_tasks() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        let reversed: Vec<String> = f.items.iter().rev().cloned().collect();
        let tasks = start_sprint(&f.store, &f.sprint, &f.project, &reversed).unwrap();
        assert_eq!(tasks.len(), 3);
        let all = list_tasks(&f.store, &f.project, None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(check_dense(&all).is_empty());
        let titles: Vec<&str> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[test]
    fn start_rejects_foreign_and_unknown_items() {
        let f = fixture();
        let other = create_project(&f.store, "Other", "OTH", None).unwrap();
        let foreign = create_item(&f.store, &other.id, NewBacklogItem::new("X")).unwrap();
        let mut ids = f.items.clone();
        ids.push(foreign.id);
        assert!(matches!(
            start_sprint(&f.store, &f.sprint, &f.project, &ids),
            Err(EngageError::InvalidArgument(_))
        ));
        assert!(matches!(
            start_sprint(&f.store, &f.sprint, &f.project, &["ghost".to_string()]),
            Err(EngageError::ItemNotFound(_))
        ));
        assert_eq!(
            load_sprint(&f.store, &f.sprint).unwrap().status,
            SprintStatus::NotStarted
        );
    }

    #[test]
    fn complete_with_open_tasks_changes_nothing() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        let tasks = list_tasks(&f.store, &f.project, Some(&f.sprint)).unwrap();
        move_task(&f.store, &tasks[0].id, ItemStatus::Complete, 0).unwrap();

        let err = complete_sprint(&f.store, &f.sprint, &f.project).unwrap_err();
        match err {
            EngageError::PreconditionFailed(msg) => {
                assert!(msg.contains("2 open task"), "{msg}");
                assert!(msg.contains("ACME-2"), "{msg}");
            }
            other => panic!("expected PreconditionFailed, got {other:?}"),
        }
        assert_eq!(
            load_sprint(&f.store, &f.sprint).unwrap().status,
            SprintStatus::Active
        );
        assert_eq!(list_tasks(&f.store, &f.project, None).unwrap().len(), 3);
    }

    #[test]
    fn unscheduled_item_no_longer_blocks_completion() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        let c = assign_sprint(&f.store, &f.items[2], None).unwrap();
        assert!(c.sprint_id.is_none());

        let tasks = list_tasks(&f.store, &f.project, None).unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert!(check_dense(&tasks).is_empty());

        finish_all(&f);
        let sprint = complete_sprint(&f.store, &f.sprint, &f.project).unwrap();
        assert_eq!(sprint.status, SprintStatus::Completed);
        let c = backlog::load_item(&f.store, &f.items[2]).unwrap();
        assert_eq!(c.status, ItemStatus::ToDo);
    }

    #[test]
    fn item_moved_to_another_sprint_counts_there() {
        let f = fixture();
        let next = create_sprint(&f.store, &f.project, NewSprint::new("Wave 2")).unwrap();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        assign_sprint(&f.store, &f.items[2], Some(&next.id)).unwrap();

        let tasks = list_tasks(&f.store, &f.project, Some(&f.sprint)).unwrap();
        assert_eq!(tasks.len(), 2);
        move_task(&f.store, &tasks[0].id, ItemStatus::Complete, 0).unwrap();
        match complete_sprint(&f.store, &f.sprint, &f.project).unwrap_err() {
            EngageError::PreconditionFailed(msg) => {
                assert!(msg.contains("1 open task"), "{msg}");
                assert!(!msg.contains("ACME-3"), "{msg}");
            }
            other => panic!("expected PreconditionFailed, got {other:?}"),
        }

        finish_all(&f);
        complete_sprint(&f.store, &f.sprint, &f.project).unwrap();
        let c = backlog::load_item(&f.store, &f.items[2]).unwrap();
        assert_eq!(c.sprint_id.as_deref(), Some(next.id.as_str()));

        let started = start_sprint(&f.store, &next.id, &f.project, &[c.id.clone()]).unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].order, 0);
    }

    #[test]
    fn completion_only_counts_tasks_of_scheduled_items() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        // A task still tagged with the sprint whose item is not scheduled in it.
        let outsider = create_item(&f.store, &f.project, NewBacklogItem::new("D")).unwrap();
        let stray = Task::from_item(&outsider, &f.sprint, 3);
        f.store.transaction(|txn| txn.put(&stray)).unwrap();

        for t in list_tasks(&f.store, &f.project, None).unwrap() {
            if f.items.contains(&t.backlog_item_id) {
                move_task(&f.store, &t.id, ItemStatus::Complete, 0).unwrap();
            }
        }
        complete_sprint(&f.store, &f.sprint, &f.project).unwrap();

        let left = list_tasks(&f.store, &f.project, None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, stray.id);
        assert!(check_dense(&left).is_empty());
    }

    #[test]
    fn complete_removes_tasks_and_keeps_items_complete() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        finish_all(&f);

        let sprint = complete_sprint(&f.store, &f.sprint, &f.project).unwrap();
        assert_eq!(sprint.status, SprintStatus::Completed);
        assert!(sprint.completed_at.is_some());
        assert!(list_tasks(&f.store, &f.project, None).unwrap().is_empty());

        let items = list_items(&f.store, &f.project).unwrap();
        assert!(items.iter().all(|i| i.status == ItemStatus::Complete));
        assert!(check_dense(&items).is_empty());

        // Completed is terminal.
        assert!(matches!(
            start_sprint(&f.store, &f.sprint, &f.project, &f.items),
            Err(EngageError::PreconditionFailed(_))
        ));
        assert!(matches!(
            complete_sprint(&f.store, &f.sprint, &f.project),
            Err(EngageError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn complete_requires_active_sprint() {
        let f = fixture();
        assert!(matches!(
            complete_sprint(&f.store, &f.sprint, &f.project),
            Err(EngageError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn delete_unassigns_items_and_removes_sprint() {
        let f = fixture();
        start_sprint(&f.store, &f.sprint, &f.project, &f.items).unwrap();
        let n = delete_sprint(&f.store, &f.sprint).unwrap();
        assert_eq!(n, 3);

        assert!(matches!(
            load_sprint(&f.store, &f.sprint),
            Err(EngageError::SprintNotFound(_))
        ));
        let items = list_items(&f.store, &f.project).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.sprint_id.is_none()));
        assert!(list_tasks(&f.store, &f.project, None).unwrap().is_empty());
        assert!(sprint_items(&f.store, &f.sprint).is_err());
    }

    #[test]
    fn find_by_name_is_scoped_to_project() {
        let f = fixture();
        assert_eq!(find_sprint(&f.store, &f.project, "wave 1").unwrap().id, f.sprint);
        assert_eq!(find_sprint(&f.store, &f.project, &f.sprint).unwrap().name, "Wave 1");
        let other = create_project(&f.store, "Other", "OTH", None).unwrap();
        assert!(find_sprint(&f.store, &other.id, &f.sprint).is_err());
        assert!(find_sprint(&f.store, &other.id, "Wave 1").is_err());
    }

    #[test]
    fn wrong_project_is_invalid_argument() {
        let f = fixture();
        let other = create_project(&f.store, "Other", "OTH", None).unwrap();
        assert!(matches!(
            start_sprint(&f.store, &f.sprint, &other.id, &f.items),
            Err(EngageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn create_validates_dates() {
        let f = fixture();
        let mut new = NewSprint::new("Backwards");
        new.start_date = NaiveDate::from_ymd_opt(2026, 3, 10);
        new.end_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert!(create_sprint(&f.store, &f.project, new).is_err());
        assert_eq!(sprint_items(&f.store, &f.sprint).unwrap().len(), 3);
    }
}

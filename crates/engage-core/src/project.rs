use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngageError, Result};
use crate::store::{Collection, Document, Store, Txn};

/// Root of every engagement record. Holds the counters that hand out
/// human-facing backlog and epic numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Short uppercase code used in item references, e.g. `ACME-12`.
    pub key: String,
    #[serde(default)]
    pub client: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub next_backlog_id: u32,
    pub next_epic_id: u32,
}

impl Document for Project {
    const COLLECTION: Collection = Collection::Projects;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> Option<&str> {
        None
    }
}

impl Project {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            key: key.into(),
            client: None,
            created_at: now,
            last_activity: now,
            next_backlog_id: 1,
            next_epic_id: 1,
        }
    }

    /// `KEY-n` reference for a backlog number.
    pub fn reference(&self, backlog_id: u32) -> String {
        format!("{}-{}", self.key, backlog_id)
    }
}

/// Project keys are 2-10 ASCII letters or digits, starting with a letter.
pub fn validate_key(key: &str) -> Result<String> {
    let upper = key.trim().to_ascii_uppercase();
    let ok = (2..=10).contains(&upper.len())
        && upper.starts_with(|c: char| c.is_ascii_alphabetic())
        && upper.chars().all(|c| c.is_ascii_alphanumeric());
    if ok {
        Ok(upper)
    } else {
        Err(EngageError::InvalidArgument(format!(
            "invalid project key '{key}': use 2-10 letters or digits, starting with a letter"
        )))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn create_project(
    store: &Store,
    name: &str,
    key: &str,
    client: Option<&str>,
) -> Result<Project> {
    if name.trim().is_empty() {
        return Err(EngageError::InvalidArgument("project name is empty".into()));
    }
    let key = validate_key(key)?;
    let project = store.transaction(|txn| {
        let taken = txn.list::<Project>()?.into_iter().any(|p| p.key == key);
        if taken {
            return Err(EngageError::InvalidArgument(format!(
                "project key '{key}' is already in use"
            )));
        }
        let mut project = Project::new(name.trim(), key.clone());
        project.client = client.map(str::to_string);
        txn.put(&project)?;
        Ok(project)
    })?;
    tracing::info!(project = %project.id, key = %project.key, "project created");
    Ok(project)
}

pub fn list_projects(store: &Store) -> Result<Vec<Project>> {
    let mut projects = store.list::<Project>()?;
    projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(projects)
}

pub fn load_project(store: &Store, id: &str) -> Result<Project> {
    store
        .get::<Project>(id)?
        .ok_or_else(|| EngageError::ProjectNotFound(id.to_string()))
}

/// Resolve a project by id or by key (case-insensitive).
pub fn find_project(store: &Store, id_or_key: &str) -> Result<Project> {
    if let Some(p) = store.get::<Project>(id_or_key)? {
        return Ok(p);
    }
    let key = id_or_key.to_ascii_uppercase();
    store
        .list::<Project>()?
        .into_iter()
        .find(|p| p.key == key)
        .ok_or_else(|| EngageError::ProjectNotFound(id_or_key.to_string()))
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

pub(crate) fn load_in(txn: &mut Txn, id: &str) -> Result<Project> {
    txn.get::<Project>(id)?
        .ok_or_else(|| EngageError::ProjectNotFound(id.to_string()))
}

/// Bump `last_activity` on the project. Every child write calls this.
pub(crate) fn touch(txn: &mut Txn, project: &mut Project) -> Result<()> {
    project.last_activity = Utc::now();
    txn.put(project)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("t.redb"), RetryPolicy::default()).unwrap();
        (dir, store)
    }

    #[test]
    fn key_validation() {
        assert_eq!(validate_key("acme").unwrap(), "ACME");
        assert_eq!(validate_key(" gtm2 ").unwrap(), "GTM2");
        assert!(validate_key("a").is_err());
        assert!(validate_key("2FA").is_err());
        assert!(validate_key("AC-ME").is_err());
    }

    #[test]
    fn create_and_find_by_key() {
        let (_dir, store) = open_tmp();
        let p = create_project(&store, "Acme GTM", "acme", Some("Acme Corp")).unwrap();
        assert_eq!(p.key, "ACME");
        assert_eq!(p.next_backlog_id, 1);
        assert_eq!(p.reference(12), "ACME-12");

        let by_key = find_project(&store, "acme").unwrap();
        assert_eq!(by_key.id, p.id);
        let by_id = find_project(&store, &p.id).unwrap();
        assert_eq!(by_id.client.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn duplicate_key_rejected() {
        let (_dir, store) = open_tmp();
        create_project(&store, "One", "ONE", None).unwrap();
        let err = create_project(&store, "Other", "one", None).unwrap_err();
        assert!(matches!(err, EngageError::InvalidArgument(_)));
        assert_eq!(list_projects(&store).unwrap().len(), 1);
    }

    #[test]
    fn missing_project_is_not_found() {
        let (_dir, store) = open_tmp();
        assert!(load_project(&store, "nope").unwrap_err().is_not_found());
        assert!(find_project(&store, "NOPE").unwrap_err().is_not_found());
    }
}

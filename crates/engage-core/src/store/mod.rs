//! Document store over redb.
//!
//! # Table design
//!
//! One table per [`Collection`], keyed by document id. Each value is a JSON
//! envelope:
//! ```text
//! { "version": <commit seq>, "project_id": <owner or null>, "doc": {...} }
//! ```
//! `version` is the global commit sequence number of the write that produced
//! the value (kept in the `meta` table), so a version never repeats even when
//! a document is deleted and recreated under the same id.
//!
//! All mutations go through [`Store::transaction`], an optimistic
//! read-modify-write: reads come from a redb snapshot and are recorded, writes
//! are buffered, and commit re-validates the read set inside redb's exclusive
//! write transaction. A stale read set re-runs the closure with backoff.

mod txn;

pub use txn::Txn;

use std::path::Path;

use redb::{Database, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{Config, RetryPolicy};
use crate::error::{EngageError, Result};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Projects,
    Items,
    Epics,
    Sprints,
    Tasks,
    Collections,
}

impl Collection {
    pub fn all() -> &'static [Collection] {
        &[
            Collection::Projects,
            Collection::Items,
            Collection::Epics,
            Collection::Sprints,
            Collection::Tasks,
            Collection::Collections,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Items => "items",
            Collection::Epics => "epics",
            Collection::Sprints => "sprints",
            Collection::Tasks => "tasks",
            Collection::Collections => "collections",
        }
    }

    fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.name())
    }
}

/// Key: fixed name. Value: last commit sequence number.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
const SEQ_KEY: &str = "seq";

/// A record stored in one collection.
pub trait Document: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Owning project, used by project-scoped queries. `None` for
    /// workspace-level records.
    fn project_id(&self) -> Option<&str>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u64,
    #[serde(default)]
    project_id: Option<String>,
    doc: T,
}

/// Envelope without the document body, for version checks.
#[derive(Debug, Deserialize)]
struct Header {
    version: u64,
    #[serde(default)]
    project_id: Option<String>,
}

fn header(bytes: &[u8]) -> Result<Header> {
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn store_err(e: impl std::fmt::Display) -> EngageError {
    EngageError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persistent document store shared by every engine operation.
pub struct Store {
    db: Database,
    retry: RetryPolicy,
}

impl Store {
    /// Open or create the redb database at `path`, creating every table.
    pub fn open(path: &Path, retry: RetryPolicy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        for c in Collection::all() {
            wt.open_table(c.table()).map_err(store_err)?;
        }
        wt.open_table(META).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        tracing::debug!(path = %path.display(), "store opened");
        Ok(Self { db, retry })
    }

    /// Open the store configured for the workspace at `root`.
    pub fn open_workspace(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Self::open(&config.store_path(root), config.retry)
    }

    /// Run `body` as one optimistic transaction.
    ///
    /// `body` may run several times: once per attempt until the commit
    /// validates. An `Err` from `body` aborts without writing anything.
    /// After `retry.max_attempts` conflicting attempts the call fails with
    /// [`EngageError::ConcurrentModification`].
    pub fn transaction<R>(&self, mut body: impl FnMut(&mut Txn) -> Result<R>) -> Result<R> {
        let attempts = self.retry.attempts();
        for attempt in 1..=attempts {
            let mut txn = Txn::begin(&self.db)?;
            let value = body(&mut txn)?;
            match txn.commit(&self.db)? {
                txn::Commit::Applied => return Ok(value),
                txn::Commit::Conflict(reason) => {
                    tracing::warn!(attempt, attempts, %reason, "transaction conflict");
                    if attempt < attempts {
                        std::thread::sleep(self.retry.backoff(attempt));
                    }
                }
            }
        }
        Err(EngageError::ConcurrentModification { attempts })
    }

    pub fn get<T: Document>(&self, id: &str) -> Result<Option<T>> {
        Txn::begin(&self.db)?.get(id)
    }

    pub fn list<T: Document>(&self) -> Result<Vec<T>> {
        Txn::begin(&self.db)?.list()
    }

    pub fn query_project<T: Document>(&self, project_id: &str) -> Result<Vec<T>> {
        Txn::begin(&self.db)?.query_project(project_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

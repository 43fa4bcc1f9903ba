use std::collections::BTreeMap;

use redb::{Database, ReadTransaction, ReadableTable};

use super::{header, store_err, Collection, Document, Envelope, META, SEQ_KEY};
use crate::error::Result;

/// What a transaction observed, re-checked at commit.
#[derive(Debug)]
enum ReadRecord {
    /// A single document; `None` when it was absent.
    Point {
        collection: Collection,
        id: String,
        version: Option<u64>,
    },
    /// Every document of a collection, or of one project within it.
    Scan {
        collection: Collection,
        project_id: Option<String>,
        seen: BTreeMap<String, u64>,
    },
}

#[derive(Debug)]
enum PendingWrite {
    Put {
        project_id: Option<String>,
        doc: serde_json::Value,
    },
    Delete,
}

pub(super) enum Commit {
    Applied,
    Conflict(String),
}

/// One attempt of an optimistic transaction. Obtained through
/// [`Store::transaction`](super::Store::transaction).
pub struct Txn {
    snapshot: ReadTransaction,
    reads: Vec<ReadRecord>,
    writes: BTreeMap<(Collection, String), PendingWrite>,
}

impl Txn {
    pub(super) fn begin(db: &Database) -> Result<Self> {
        Ok(Self {
            snapshot: db.begin_read().map_err(store_err)?,
            reads: Vec::new(),
            writes: BTreeMap::new(),
        })
    }

    /// Fetch one document by id.
    pub fn get<T: Document>(&mut self, id: &str) -> Result<Option<T>> {
        let collection = T::COLLECTION;
        if let Some(w) = self.writes.get(&(collection, id.to_string())) {
            return match w {
                PendingWrite::Put { doc, .. } => Ok(Some(serde_json::from_value(doc.clone())?)),
                PendingWrite::Delete => Ok(None),
            };
        }

        let table = self
            .snapshot
            .open_table(collection.table())
            .map_err(store_err)?;
        let found = match table.get(id).map_err(store_err)? {
            Some(guard) => Some(serde_json::from_slice::<Envelope<T>>(guard.value())?),
            None => None,
        };
        self.reads.push(ReadRecord::Point {
            collection,
            id: id.to_string(),
            version: found.as_ref().map(|e| e.version),
        });
        Ok(found.map(|e| e.doc))
    }

    /// Every document of `T`'s collection.
    pub fn list<T: Document>(&mut self) -> Result<Vec<T>> {
        self.scan(None)
    }

    /// Every document of `T`'s collection owned by `project_id`.
    pub fn query_project<T: Document>(&mut self, project_id: &str) -> Result<Vec<T>> {
        self.scan(Some(project_id))
    }

    fn scan<T: Document>(&mut self, project_id: Option<&str>) -> Result<Vec<T>> {
        let collection = T::COLLECTION;
        let table = self
            .snapshot
            .open_table(collection.table())
            .map_err(store_err)?;

        let mut seen = BTreeMap::new();
        let mut docs: BTreeMap<String, T> = BTreeMap::new();
        for entry in table.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            let env: Envelope<T> = serde_json::from_slice(v.value())?;
            if project_id.is_none() || env.project_id.as_deref() == project_id {
                let id = k.value().to_string();
                seen.insert(id.clone(), env.version);
                docs.insert(id, env.doc);
            }
        }
        self.reads.push(ReadRecord::Scan {
            collection,
            project_id: project_id.map(str::to_string),
            seen,
        });

        for ((c, id), w) in &self.writes {
            if *c != collection {
                continue;
            }
            match w {
                PendingWrite::Put {
                    project_id: owner,
                    doc,
                } if project_id.is_none() || owner.as_deref() == project_id => {
                    docs.insert(id.clone(), serde_json::from_value(doc.clone())?);
                }
                _ => {
                    docs.remove(id);
                }
            }
        }
        Ok(docs.into_values().collect())
    }

    /// Buffer an insert-or-replace of `doc`.
    pub fn put<T: Document>(&mut self, doc: &T) -> Result<()> {
        let pending = PendingWrite::Put {
            project_id: doc.project_id().map(str::to_string),
            doc: serde_json::to_value(doc)?,
        };
        self.writes
            .insert((T::COLLECTION, doc.id().to_string()), pending);
        Ok(())
    }

    /// Buffer a delete. Deleting an absent document is not an error.
    pub fn delete<T: Document>(&mut self, id: &str) {
        self.writes
            .insert((T::COLLECTION, id.to_string()), PendingWrite::Delete);
    }

    /// Validate the read set and apply the buffered writes atomically.
    pub(super) fn commit(self, db: &Database) -> Result<Commit> {
        if self.writes.is_empty() {
            return Ok(Commit::Applied);
        }
        drop(self.snapshot);

        let wt = db.begin_write().map_err(store_err)?;

        for read in &self.reads {
            if let Some(reason) = stale(&wt, read)? {
                wt.abort().map_err(store_err)?;
                return Ok(Commit::Conflict(reason));
            }
        }

        let seq = {
            let mut meta = wt.open_table(META).map_err(store_err)?;
            let next = meta
                .get(SEQ_KEY)
                .map_err(store_err)?
                .map(|g| g.value())
                .unwrap_or(0)
                + 1;
            meta.insert(SEQ_KEY, next).map_err(store_err)?;
            next
        };

        for ((collection, id), write) in self.writes {
            let mut table = wt.open_table(collection.table()).map_err(store_err)?;
            match write {
                PendingWrite::Put { project_id, doc } => {
                    let bytes = serde_json::to_vec(&Envelope {
                        version: seq,
                        project_id,
                        doc,
                    })?;
                    table
                        .insert(id.as_str(), bytes.as_slice())
                        .map_err(store_err)?;
                }
                PendingWrite::Delete => {
                    table.remove(id.as_str()).map_err(store_err)?;
                }
            }
        }

        wt.commit().map_err(store_err)?;
        tracing::trace!(seq, "transaction committed");
        Ok(Commit::Applied)
    }
}

/// Describe how `read` no longer matches the store, or `None` if it still does.
fn stale(wt: &redb::WriteTransaction, read: &ReadRecord) -> Result<Option<String>> {
    match read {
        ReadRecord::Point {
            collection,
            id,
            version,
        } => {
            let table = wt.open_table(collection.table()).map_err(store_err)?;
            let current = match table.get(id.as_str()).map_err(store_err)? {
                Some(guard) => Some(header(guard.value())?.version),
                None => None,
            };
            if current != *version {
                return Ok(Some(format!(
                    "{}/{id} changed ({version:?} -> {current:?})",
                    collection.name()
                )));
            }
        }
        ReadRecord::Scan {
            collection,
            project_id,
            seen,
        } => {
            let table = wt.open_table(collection.table()).map_err(store_err)?;
            let mut current = BTreeMap::new();
            for entry in table.iter().map_err(store_err)? {
                let (k, v) = entry.map_err(store_err)?;
                let h = header(v.value())?;
                if project_id.is_none() || h.project_id == *project_id {
                    current.insert(k.value().to_string(), h.version);
                }
            }
            if current != *seen {
                return Ok(Some(format!(
                    "{} scan for {} changed",
                    collection.name(),
                    project_id.as_deref().unwrap_or("*")
                )));
            }
        }
    }
    Ok(None)
}

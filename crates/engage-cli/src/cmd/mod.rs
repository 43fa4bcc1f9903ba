pub mod board;
pub mod collection;
pub mod config;
pub mod epic;
pub mod init;
pub mod item;
pub mod project;
pub mod sprint;
pub mod task;
pub mod ui;

use anyhow::Context;
use engage_core::project::{self as project_ops, Project};
use engage_core::Store;
use std::path::Path;

/// Open the workspace store configured under `root`.
pub(crate) fn open_store(root: &Path) -> anyhow::Result<Store> {
    Store::open_workspace(root)
        .with_context(|| format!("failed to open workspace at {}", root.display()))
}

/// Look a project up by id or key.
pub(crate) fn resolve_project(store: &Store, id_or_key: &str) -> anyhow::Result<Project> {
    project_ops::find_project(store, id_or_key)
        .with_context(|| format!("project '{id_or_key}' not found"))
}

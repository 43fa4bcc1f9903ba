use std::path::{Path, PathBuf};

pub const ENGAGE_DIR: &str = ".engage";
pub const CONFIG_FILE: &str = ".engage/config.yaml";
pub const DEFAULT_STORE_FILE: &str = ".engage/engage.redb";

pub fn engage_dir(root: &Path) -> PathBuf {
    root.join(ENGAGE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured store path against the workspace root.
/// Absolute paths are used as-is.
pub fn store_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

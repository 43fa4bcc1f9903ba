use crate::output::print_json;
use anyhow::Context;
use engage_core::config::Config;
use engage_core::{io, paths, Store};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let workspace_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string())
    });

    let dir = paths::engage_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let created = !config_path.exists();
    if created {
        Config::new(&workspace_name)
            .save(root)
            .context("failed to write config.yaml")?;
    }
    let config = Config::load(root).context("failed to load config.yaml")?;

    // Creates the database file and its tables.
    let store_path = config.store_path(root);
    Store::open(&store_path, config.retry.clone())
        .with_context(|| format!("failed to create store at {}", store_path.display()))?;
    io::ensure_gitignore_entry(root, paths::DEFAULT_STORE_FILE)
        .context("failed to update .gitignore")?;

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "workspace": config.workspace.name,
            "config_created": created,
            "store": store_path,
        }))?;
    } else {
        println!("Initializing engage in: {}", root.display());
        if created {
            println!("  created: {}", paths::CONFIG_FILE);
        } else {
            println!("  exists:  {}", paths::CONFIG_FILE);
        }
        println!("  store:   {}", store_path.display());
    }
    Ok(())
}

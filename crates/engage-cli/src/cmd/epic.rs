use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use engage_core::{backlog, epic as epic_ops};
use std::path::Path;

#[derive(Subcommand)]
pub enum EpicSubcommand {
    /// Add an epic to a project
    Add {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List a project's epics
    List {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
    },
    /// Delete an epic and every backlog item under it
    Delete {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        /// Epic id or number
        epic: String,
    },
}

pub fn run(root: &Path, subcmd: EpicSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EpicSubcommand::Add {
            project,
            title,
            description,
        } => add(root, &project, &title.join(" "), description.as_deref(), json),
        EpicSubcommand::List { project } => list(root, &project, json),
        EpicSubcommand::Delete { project, epic } => delete(root, &project, &epic, json),
    }
}

fn add(
    root: &Path,
    project: &str,
    title: &str,
    description: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, project)?;
    let epic = epic_ops::create_epic(&store, &project.id, title, description)?;
    if json {
        print_json(&epic)?;
    } else {
        println!("Added epic #{}: {}", epic.epic_id, epic.title);
    }
    Ok(())
}

fn list(root: &Path, project: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, project)?;
    let epics = epic_ops::list_epics(&store, &project.id)?;
    if json {
        return print_json(&epics);
    }
    if epics.is_empty() {
        println!("No epics for {}.", project.key);
        return Ok(());
    }
    let items = backlog::list_items(&store, &project.id)?;
    let rows = epics
        .iter()
        .map(|e| {
            let count = items
                .iter()
                .filter(|i| i.epic_id.as_deref() == Some(e.id.as_str()))
                .count();
            vec![
                format!("#{}", e.epic_id),
                e.title.clone(),
                count.to_string(),
                or_dash(e.description.as_deref()),
            ]
        })
        .collect();
    print_table(&["EPIC", "TITLE", "ITEMS", "DESCRIPTION"], rows);
    Ok(())
}

fn delete(root: &Path, project: &str, epic: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, project)?;
    let epic = epic_ops::find_epic(&store, &project.id, epic)?;
    let removed = epic_ops::delete_epic(&store, &epic.id)?;
    if json {
        print_json(&serde_json::json!({ "epic": epic.id, "items_removed": removed }))?;
    } else {
        println!("Deleted epic #{} and {removed} backlog item(s)", epic.epic_id);
    }
    Ok(())
}

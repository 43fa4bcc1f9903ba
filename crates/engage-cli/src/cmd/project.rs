use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table, short_id};
use anyhow::Context;
use clap::Subcommand;
use engage_core::types::ItemStatus;
use engage_core::{backlog, epic, project as project_ops, sprint};
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Create a project
    Create {
        /// Display name
        #[arg(required = true)]
        name: Vec<String>,
        /// Short key used in item references (e.g. ACME → ACME-12)
        #[arg(long)]
        key: String,
        /// Client organisation
        #[arg(long)]
        client: Option<String>,
    },
    /// List projects
    List,
    /// Show a project with its board totals
    Show {
        /// Project id or key
        project: String,
    },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Create { name, key, client } => {
            create(root, &name.join(" "), &key, client.as_deref(), json)
        }
        ProjectSubcommand::List => list(root, json),
        ProjectSubcommand::Show { project } => show(root, &project, json),
    }
}

fn create(
    root: &Path,
    name: &str,
    key: &str,
    client: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = project_ops::create_project(&store, name, key, client)
        .with_context(|| format!("failed to create project '{name}'"))?;
    if json {
        print_json(&project)?;
    } else {
        println!("Created project {} [{}]", project.name, project.key);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let projects = project_ops::list_projects(&store)?;
    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects. Create one with `engage project create`.");
        return Ok(());
    }
    let rows = projects
        .iter()
        .map(|p| {
            vec![
                p.key.clone(),
                p.name.clone(),
                or_dash(p.client.as_deref()),
                p.last_activity.format("%Y-%m-%d %H:%M").to_string(),
                short_id(&p.id),
            ]
        })
        .collect();
    print_table(&["KEY", "NAME", "CLIENT", "LAST ACTIVITY", "ID"], rows);
    Ok(())
}

fn show(root: &Path, id_or_key: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, id_or_key)?;
    let items = backlog::list_items(&store, &project.id)?;
    let sprints = sprint::list_sprints(&store, &project.id)?;
    let epics = epic::list_epics(&store, &project.id)?;

    let columns: Vec<(ItemStatus, usize)> = ItemStatus::all()
        .iter()
        .map(|&s| (s, items.iter().filter(|i| i.status == s).count()))
        .collect();

    if json {
        let counts: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .map(|(s, n)| (s.as_str().to_string(), serde_json::json!(n)))
            .collect();
        return print_json(&serde_json::json!({
            "project": project,
            "items": counts,
            "sprints": sprints.len(),
            "epics": epics.len(),
        }));
    }

    println!("Project: {} [{}]", project.name, project.key);
    println!("Client:  {}", or_dash(project.client.as_deref()));
    println!("Id:      {}", project.id);
    println!("Created: {}", project.created_at.format("%Y-%m-%d"));
    println!("Active:  {}", project.last_activity.format("%Y-%m-%d %H:%M"));
    println!();
    for (status, n) in &columns {
        println!("  {:<16}{n}", status.label());
    }
    println!();
    println!("{} epic(s), {} sprint(s)", epics.len(), sprints.len());
    Ok(())
}

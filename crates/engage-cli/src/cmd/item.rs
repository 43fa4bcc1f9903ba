use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use engage_core::backlog::{self, BacklogItem, BacklogItemPatch, NewBacklogItem};
use engage_core::project::Project;
use engage_core::types::{ItemStatus, ItemType, Priority};
use engage_core::{epic, project as project_ops, sprint, Store};
use std::collections::HashMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// Add a backlog item (appended to the end of its column)
    Add {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, or high
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        points: Option<u32>,
        #[arg(long)]
        owner: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// story, task, bug, spike, or chore
        #[arg(long = "type")]
        item_type: Option<ItemType>,
        /// Epic id or number
        #[arg(long)]
        epic: Option<String>,
        /// Sprint id or name
        #[arg(long)]
        sprint: Option<String>,
        /// Initial column (default: To Do)
        #[arg(long)]
        status: Option<ItemStatus>,
    },
    /// List a project's backlog items in board order
    List {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        /// Only items in this column
        #[arg(long)]
        status: Option<ItemStatus>,
        /// Only items scheduled into this sprint (id or name)
        #[arg(long)]
        sprint: Option<String>,
    },
    /// Show one item
    Show {
        /// Item id or reference (e.g. ACME-12)
        item: String,
    },
    /// Edit non-ordering fields
    Edit {
        item: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        points: Option<u32>,
        #[arg(long)]
        owner: Option<String>,
        /// Clear the owner
        #[arg(long, conflicts_with = "owner")]
        no_owner: bool,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long = "type")]
        item_type: Option<ItemType>,
        /// Epic id or number
        #[arg(long)]
        epic: Option<String>,
        /// Detach from its epic
        #[arg(long, conflicts_with = "epic")]
        no_epic: bool,
    },
    /// Move an item to a column position
    Move {
        item: String,
        /// Destination column, e.g. in_progress or "In Review"
        status: ItemStatus,
        /// Position in the destination column (default: end)
        index: Option<usize>,
    },
    /// Schedule an item into a sprint, or back to the backlog
    Assign {
        item: String,
        /// Sprint id or name; omit to unschedule
        #[arg(long)]
        sprint: Option<String>,
    },
    /// Delete an item and its sprint task
    Delete { item: String },
}

pub fn run(root: &Path, subcmd: ItemSubcommand, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    match subcmd {
        ItemSubcommand::Add {
            project,
            title,
            description,
            priority,
            points,
            owner,
            due,
            item_type,
            epic,
            sprint,
            status,
        } => {
            let project = resolve_project(&store, &project)?;
            let mut new = NewBacklogItem::new(title.join(" "));
            new.description = description;
            new.priority = priority.unwrap_or_default();
            new.points = points.unwrap_or(0);
            new.owner = owner;
            new.due_date = due;
            new.item_type = item_type.unwrap_or_default();
            new.status = status.unwrap_or_default();
            if let Some(e) = epic {
                new.epic_id = Some(epic::find_epic(&store, &project.id, &e)?.id);
            }
            if let Some(s) = sprint {
                new.sprint_id = Some(sprint::find_sprint(&store, &project.id, &s)?.id);
            }
            add(&store, &project, new, json)
        }
        ItemSubcommand::List {
            project,
            status,
            sprint,
        } => list(&store, &project, status, sprint.as_deref(), json),
        ItemSubcommand::Show { item } => show(&store, &item, json),
        ItemSubcommand::Edit {
            item,
            title,
            description,
            priority,
            points,
            owner,
            no_owner,
            due,
            item_type,
            epic,
            no_epic,
        } => {
            let current = backlog::find_item(&store, &item)?;
            let epic_id = match (epic, no_epic) {
                (_, true) => Some(None),
                (Some(e), false) => Some(Some(epic::find_epic(&store, &current.project_id, &e)?.id)),
                (None, false) => None,
            };
            let patch = BacklogItemPatch {
                title,
                description: description.map(Some),
                priority,
                owner: if no_owner { Some(None) } else { owner.map(Some) },
                owner_avatar: None,
                points,
                due_date: due.map(Some),
                item_type,
                epic_id,
            };
            edit(&store, &current, patch, json)
        }
        ItemSubcommand::Move {
            item,
            status,
            index,
        } => move_item(&store, &item, status, index, json),
        ItemSubcommand::Assign { item, sprint } => assign(&store, &item, sprint.as_deref(), json),
        ItemSubcommand::Delete { item } => delete(&store, &item, json),
    }
}

fn add(store: &Store, project: &Project, new: NewBacklogItem, json: bool) -> anyhow::Result<()> {
    let item = backlog::create_item(store, &project.id, new)?;
    if json {
        print_json(&item)?;
    } else {
        println!(
            "Added {}: {} ({} #{})",
            project.reference(item.backlog_id),
            item.title,
            item.status,
            item.order
        );
    }
    Ok(())
}

fn list(
    store: &Store,
    project: &str,
    status: Option<ItemStatus>,
    sprint_filter: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let project = resolve_project(store, project)?;
    let sprint_id = match sprint_filter {
        Some(s) => Some(sprint::find_sprint(store, &project.id, s)?.id),
        None => None,
    };
    let items: Vec<BacklogItem> = backlog::list_items(store, &project.id)?
        .into_iter()
        .filter(|i| status.map_or(true, |s| i.status == s))
        .filter(|i| sprint_id.is_none() || i.sprint_id == sprint_id)
        .collect();

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No backlog items.");
        return Ok(());
    }

    let sprint_names: HashMap<String, String> = sprint::list_sprints(store, &project.id)?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let rows = items
        .iter()
        .map(|i| {
            vec![
                project.reference(i.backlog_id),
                i.status.label().to_string(),
                i.order.to_string(),
                i.title.clone(),
                i.priority.to_string(),
                i.points.to_string(),
                or_dash(i.owner.as_deref()),
                or_dash(
                    i.sprint_id
                        .as_ref()
                        .and_then(|s| sprint_names.get(s))
                        .map(String::as_str),
                ),
            ]
        })
        .collect();
    print_table(
        &["REF", "STATUS", "#", "TITLE", "PRIORITY", "PTS", "OWNER", "SPRINT"],
        rows,
    );
    Ok(())
}

fn show(store: &Store, item: &str, json: bool) -> anyhow::Result<()> {
    let item = backlog::find_item(store, item)?;
    if json {
        return print_json(&item);
    }
    let project = project_ops::load_project(store, &item.project_id)?;
    println!("Item: {}", project.reference(item.backlog_id));
    println!("Title:       {}", item.title);
    println!("Status:      {} (position {})", item.status, item.order);
    println!("Type:        {}", item.item_type);
    println!("Priority:    {}", item.priority);
    println!("Points:      {}", item.points);
    println!("Owner:       {}", or_dash(item.owner.as_deref()));
    if let Some(due) = item.due_date {
        println!("Due:         {due}");
    }
    if let Some(e) = &item.epic_id {
        let epic = epic::load_epic(store, e)?;
        println!("Epic:        #{} {}", epic.epic_id, epic.title);
    }
    if let Some(s) = &item.sprint_id {
        let sprint = sprint::load_sprint(store, s)?;
        println!("Sprint:      {} ({})", sprint.name, sprint.status);
    }
    if let Some(desc) = &item.description {
        println!("Description: {desc}");
    }
    println!("Id:          {}", item.id);
    Ok(())
}

fn edit(
    store: &Store,
    current: &BacklogItem,
    patch: BacklogItemPatch,
    json: bool,
) -> anyhow::Result<()> {
    let item = backlog::update_item(store, &current.id, patch)
        .with_context(|| format!("failed to update item {}", current.id))?;
    if json {
        print_json(&item)?;
    } else {
        println!("Updated item: {}", item.title);
    }
    Ok(())
}

fn move_item(
    store: &Store,
    item: &str,
    status: ItemStatus,
    index: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let current = backlog::find_item(store, item)?;
    let index = match index {
        Some(i) => i,
        None => {
            let board = backlog::board(store, &current.project_id)?;
            board
                .column(status)
                .iter()
                .filter(|i| i.id != current.id)
                .count()
        }
    };
    let moved = backlog::move_item(store, &current.id, status, index, None)?;
    if json {
        print_json(&moved)?;
    } else {
        println!(
            "Moved {} to {} at position {}",
            moved.title, moved.status, moved.order
        );
    }
    Ok(())
}

fn assign(store: &Store, item: &str, sprint_ref: Option<&str>, json: bool) -> anyhow::Result<()> {
    let current = backlog::find_item(store, item)?;
    let sprint = match sprint_ref {
        Some(s) => Some(sprint::find_sprint(store, &current.project_id, s)?),
        None => None,
    };
    let updated = backlog::assign_sprint(store, &current.id, sprint.as_ref().map(|s| s.id.as_str()))?;
    if json {
        print_json(&updated)?;
    } else if let Some(s) = sprint {
        println!("Scheduled {} into {}", updated.title, s.name);
    } else {
        println!("Moved {} back to the backlog", updated.title);
    }
    Ok(())
}

fn delete(store: &Store, item: &str, json: bool) -> anyhow::Result<()> {
    let current = backlog::find_item(store, item)?;
    backlog::delete_item(store, &current.id)?;
    if json {
        print_json(&serde_json::json!({ "deleted": current.id }))?;
    } else {
        println!("Deleted {}", current.title);
    }
    Ok(())
}

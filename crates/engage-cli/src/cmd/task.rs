use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use engage_core::types::ItemStatus;
use engage_core::{project as project_ops, sprint, task as task_ops};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List sprint tasks in board order
    List {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        /// Only tasks of this sprint (id or name)
        #[arg(long)]
        sprint: Option<String>,
    },
    /// Move a task; its backlog item follows to the same column
    Move {
        /// Task id or item reference (e.g. ACME-12)
        task: String,
        status: ItemStatus,
        /// Position in the destination column (default: end)
        index: Option<usize>,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    match subcmd {
        TaskSubcommand::List { project, sprint } => {
            let project = resolve_project(&store, &project)?;
            let sprint_id = match sprint {
                Some(s) => Some(sprint::find_sprint(&store, &project.id, &s)?.id),
                None => None,
            };
            let tasks = task_ops::list_tasks(&store, &project.id, sprint_id.as_deref())?;
            if json {
                return print_json(&tasks);
            }
            if tasks.is_empty() {
                println!("No tasks. Start a sprint with `engage sprint start`.");
                return Ok(());
            }
            let rows = tasks
                .iter()
                .map(|t| {
                    vec![
                        project.reference(t.backlog_ref),
                        t.status.label().to_string(),
                        t.order.to_string(),
                        t.title.clone(),
                        t.points.to_string(),
                        or_dash(t.owner.as_deref()),
                    ]
                })
                .collect();
            print_table(&["REF", "STATUS", "#", "TITLE", "PTS", "OWNER"], rows);
        }
        TaskSubcommand::Move {
            task,
            status,
            index,
        } => {
            let current = task_ops::find_task(&store, &task)?;
            let index = match index {
                Some(i) => i,
                None => task_ops::task_board(&store, &current.project_id)?
                    .column(status)
                    .iter()
                    .filter(|t| t.id != current.id)
                    .count(),
            };
            let moved = task_ops::move_task(&store, &current.id, status, index)?;
            if json {
                print_json(&moved)?;
            } else {
                let project = project_ops::load_project(&store, &moved.project_id)?;
                println!(
                    "Moved {} to {} at position {}",
                    project.reference(moved.backlog_ref),
                    moved.status,
                    moved.order
                );
            }
        }
    }
    Ok(())
}

use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table};
use chrono::NaiveDate;
use clap::Subcommand;
use engage_core::sprint::{self as sprint_ops, NewSprint};
use std::path::Path;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// Create a sprint (status: Not Started)
    Create {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        #[arg(required = true)]
        name: Vec<String>,
        #[arg(long)]
        goal: Option<String>,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List a project's sprints
    List {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
    },
    /// Start a sprint: one To Do task per scheduled item
    Start {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        /// Sprint id or name
        sprint: String,
    },
    /// Complete a sprint whose tasks are all Complete
    Complete {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        sprint: String,
    },
    /// Delete a sprint; its items return to the backlog
    Delete {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        sprint: String,
    },
}

pub fn run(root: &Path, subcmd: SprintSubcommand, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    match subcmd {
        SprintSubcommand::Create {
            project,
            name,
            goal,
            start,
            end,
        } => {
            let project = resolve_project(&store, &project)?;
            let new = NewSprint {
                name: name.join(" "),
                goal,
                start_date: start,
                end_date: end,
            };
            let sprint = sprint_ops::create_sprint(&store, &project.id, new)?;
            if json {
                print_json(&sprint)?;
            } else {
                println!("Created sprint '{}'", sprint.name);
            }
        }
        SprintSubcommand::List { project } => {
            let project = resolve_project(&store, &project)?;
            let sprints = sprint_ops::list_sprints(&store, &project.id)?;
            if json {
                return print_json(&sprints);
            }
            if sprints.is_empty() {
                println!("No sprints for {}.", project.key);
                return Ok(());
            }
            let rows = sprints
                .iter()
                .map(|s| {
                    let dates = match (s.start_date, s.end_date) {
                        (Some(a), Some(b)) => format!("{a} → {b}"),
                        (Some(a), None) => format!("from {a}"),
                        (None, Some(b)) => format!("until {b}"),
                        (None, None) => "-".to_string(),
                    };
                    vec![
                        s.name.clone(),
                        s.status.label().to_string(),
                        dates,
                        or_dash(s.goal.as_deref()),
                    ]
                })
                .collect();
            print_table(&["SPRINT", "STATUS", "DATES", "GOAL"], rows);
        }
        SprintSubcommand::Start { project, sprint } => {
            let project = resolve_project(&store, &project)?;
            let sprint = sprint_ops::find_sprint(&store, &project.id, &sprint)?;
            let ids: Vec<String> = sprint_ops::sprint_items(&store, &sprint.id)?
                .into_iter()
                .map(|i| i.id)
                .collect();
            let tasks = sprint_ops::start_sprint(&store, &sprint.id, &project.id, &ids)?;
            if json {
                print_json(&tasks)?;
            } else {
                println!("Started '{}' with {} task(s)", sprint.name, tasks.len());
            }
        }
        SprintSubcommand::Complete { project, sprint } => {
            let project = resolve_project(&store, &project)?;
            let sprint = sprint_ops::find_sprint(&store, &project.id, &sprint)?;
            let done = sprint_ops::complete_sprint(&store, &sprint.id, &project.id)?;
            if json {
                print_json(&done)?;
            } else {
                println!("Completed '{}'", done.name);
            }
        }
        SprintSubcommand::Delete { project, sprint } => {
            let project = resolve_project(&store, &project)?;
            let sprint = sprint_ops::find_sprint(&store, &project.id, &sprint)?;
            let unassigned = sprint_ops::delete_sprint(&store, &sprint.id)?;
            if json {
                print_json(&serde_json::json!({
                    "deleted": sprint.id,
                    "items_unassigned": unassigned,
                }))?;
            } else {
                println!(
                    "Deleted '{}'; {unassigned} item(s) returned to the backlog",
                    sprint.name
                );
            }
        }
    }
    Ok(())
}

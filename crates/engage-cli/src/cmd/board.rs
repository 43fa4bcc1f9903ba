use super::{open_store, resolve_project};
use crate::output::print_json;
use clap::Subcommand;
use engage_core::backlog;
use engage_core::ordering::DensityViolation;
use engage_core::task;
use std::path::Path;

#[derive(Subcommand)]
pub enum BoardSubcommand {
    /// Print the backlog board column by column
    Show {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
    },
    /// Verify every column of the backlog and task boards is densely ordered
    Check {
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
    },
}

pub fn run(root: &Path, subcmd: BoardSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BoardSubcommand::Show { project } => show(root, &project, json),
        BoardSubcommand::Check { project } => check(root, &project, json),
    }
}

fn show(root: &Path, project: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, project)?;
    let board = backlog::board(&store, &project.id)?;
    if json {
        return print_json(&board);
    }

    println!("{} [{}]: {} item(s)", project.name, project.key, board.len());
    if board.is_empty() {
        println!("No backlog items.");
        return Ok(());
    }
    for column in &board.columns {
        println!();
        println!("{} ({})", column.label, column.items.len());
        for item in &column.items {
            let owner = item
                .owner
                .as_deref()
                .map(|o| format!("  @{o}"))
                .unwrap_or_default();
            println!(
                "  {:>3}. {:<10} {}{owner}",
                item.order,
                project.reference(item.backlog_id),
                item.title
            );
        }
    }
    Ok(())
}

fn check(root: &Path, project: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let project = resolve_project(&store, project)?;
    let items = backlog::board(&store, &project.id)?.check_dense();
    let tasks = task::task_board(&store, &project.id)?.check_dense();

    if json {
        print_json(&serde_json::json!({
            "project": project.key,
            "items": items,
            "tasks": tasks,
        }))?;
    } else {
        report("backlog", &items);
        report("tasks", &tasks);
    }

    if !items.is_empty() || !tasks.is_empty() {
        anyhow::bail!("board ordering has gaps or duplicates");
    }
    Ok(())
}

fn report(board: &str, violations: &[DensityViolation]) {
    if violations.is_empty() {
        println!("{board}: ok");
        return;
    }
    for v in violations {
        println!("{board}: {} has orders {:?}", v.status.label(), v.orders);
    }
}

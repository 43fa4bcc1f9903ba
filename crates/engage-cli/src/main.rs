mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    board::BoardSubcommand, collection::CollectionSubcommand, config::ConfigSubcommand,
    epic::EpicSubcommand, item::ItemSubcommand, project::ProjectSubcommand,
    sprint::SprintSubcommand, task::TaskSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "engage",
    about = "Engagement backlogs: ordered boards, sprints, and task execution",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .engage/ or .git/)
    #[arg(long, global = true, env = "ENGAGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an engage workspace in the current directory
    Init {
        /// Workspace name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Inspect the workspace configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage client projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Manage epics
    Epic {
        #[command(subcommand)]
        subcommand: EpicSubcommand,
    },

    /// Manage backlog items
    Item {
        #[command(subcommand)]
        subcommand: ItemSubcommand,
    },

    /// Show or check the backlog board
    Board {
        #[command(subcommand)]
        subcommand: BoardSubcommand,
    },

    /// Manage sprints
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Work the sprint task board
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Manage reusable story collections
    Collection {
        #[command(subcommand)]
        subcommand: CollectionSubcommand,
    },

    /// Launch the HTTP API server
    Ui {
        /// Port to listen on (default: server.port from config; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Ui { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Epic { subcommand } => cmd::epic::run(&root, subcommand, cli.json),
        Commands::Item { subcommand } => cmd::item::run(&root, subcommand, cli.json),
        Commands::Board { subcommand } => cmd::board::run(&root, subcommand, cli.json),
        Commands::Sprint { subcommand } => cmd::sprint::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Collection { subcommand } => cmd::collection::run(&root, subcommand, cli.json),
        Commands::Ui { port, no_open } => cmd::ui::run(&root, port, no_open),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

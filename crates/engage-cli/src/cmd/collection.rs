use super::{open_store, resolve_project};
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use engage_core::collection::{self as collection_ops, UserStory};
use engage_core::epic;
use engage_core::types::{ItemType, Priority};
use std::path::Path;

#[derive(Subcommand)]
pub enum CollectionSubcommand {
    /// Create an empty story collection
    Create {
        #[arg(required = true)]
        name: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Append a story template to a collection
    AddStory {
        /// Collection id or name
        collection: String,
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = 0)]
        points: u32,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long = "type")]
        item_type: Option<ItemType>,
    },
    /// List collections
    List,
    /// Create one To Do backlog item per story
    Import {
        collection: String,
        #[arg(long, short = 'p', env = "ENGAGE_PROJECT")]
        project: String,
        /// File the new items under this epic (id or number)
        #[arg(long)]
        epic: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: CollectionSubcommand, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    match subcmd {
        CollectionSubcommand::Create { name, description } => {
            let c =
                collection_ops::create_collection(&store, &name.join(" "), description.as_deref())?;
            if json {
                print_json(&c)?;
            } else {
                println!("Created collection '{}'", c.name);
            }
        }
        CollectionSubcommand::AddStory {
            collection,
            title,
            description,
            points,
            priority,
            item_type,
        } => {
            let target = collection_ops::find_collection(&store, &collection)?;
            let story = UserStory {
                title: title.join(" "),
                description,
                points,
                priority: priority.unwrap_or_default(),
                item_type: item_type.unwrap_or_default(),
            };
            let c = collection_ops::add_story(&store, &target.id, story)?;
            if json {
                print_json(&c)?;
            } else {
                println!("'{}' now has {} stories", c.name, c.stories.len());
            }
        }
        CollectionSubcommand::List => {
            let collections = collection_ops::list_collections(&store)?;
            if json {
                return print_json(&collections);
            }
            if collections.is_empty() {
                println!("No collections.");
                return Ok(());
            }
            let rows = collections
                .iter()
                .map(|c| {
                    let points: u32 = c.stories.iter().map(|s| s.points).sum();
                    vec![
                        c.name.clone(),
                        c.stories.len().to_string(),
                        points.to_string(),
                        or_dash(c.description.as_deref()),
                    ]
                })
                .collect();
            print_table(&["COLLECTION", "STORIES", "POINTS", "DESCRIPTION"], rows);
        }
        CollectionSubcommand::Import {
            collection,
            project,
            epic,
        } => {
            let project = resolve_project(&store, &project)?;
            let source = collection_ops::find_collection(&store, &collection)?;
            let epic_id = match epic {
                Some(e) => Some(epic::find_epic(&store, &project.id, &e)?.id),
                None => None,
            };
            let items = collection_ops::import_collection(
                &store,
                &source.id,
                &project.id,
                epic_id.as_deref(),
            )?;
            if json {
                print_json(&items)?;
            } else {
                println!(
                    "Imported {} item(s) from '{}' into {}",
                    items.len(),
                    source.name,
                    project.key
                );
            }
        }
    }
    Ok(())
}

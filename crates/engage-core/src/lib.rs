pub mod backlog;
pub mod collection;
pub mod config;
pub mod epic;
pub mod error;
pub mod io;
pub mod ordering;
pub mod paths;
pub mod project;
pub mod sprint;
pub mod store;
pub mod task;
pub mod types;

pub use error::{EngageError, Result};
pub use store::Store;

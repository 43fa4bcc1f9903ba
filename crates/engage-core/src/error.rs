use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngageError {
    #[error("not initialized: run 'engage init'")]
    NotInitialized,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("backlog item not found: {0}")]
    ItemNotFound(String),

    #[error("sprint not found: {0}")]
    SprintNotFound(String),

    #[error("epic not found: {0}")]
    EpicNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("concurrent modification: transaction gave up after {attempts} attempts")]
    ConcurrentModification { attempts: u32 },

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngageError {
    /// True for every "referenced record is absent" variant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngageError::ProjectNotFound(_)
                | EngageError::ItemNotFound(_)
                | EngageError::SprintNotFound(_)
                | EngageError::EpicNotFound(_)
                | EngageError::TaskNotFound(_)
                | EngageError::CollectionNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngageError>;

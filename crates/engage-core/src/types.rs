use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngageError;

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Workflow stage of a backlog item or task. Declaration order is board
/// column order; transitions between any two stages are allowed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    ToDo,
    InProgress,
    InReview,
    NeedsRevision,
    FinalApproval,
    Complete,
}

impl ItemStatus {
    pub fn all() -> &'static [ItemStatus] {
        &[
            ItemStatus::ToDo,
            ItemStatus::InProgress,
            ItemStatus::InReview,
            ItemStatus::NeedsRevision,
            ItemStatus::FinalApproval,
            ItemStatus::Complete,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::ToDo => "to_do",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::InReview => "in_review",
            ItemStatus::NeedsRevision => "needs_revision",
            ItemStatus::FinalApproval => "final_approval",
            ItemStatus::Complete => "complete",
        }
    }

    /// Column heading as shown on the board.
    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::ToDo => "To Do",
            ItemStatus::InProgress => "In Progress",
            ItemStatus::InReview => "In Review",
            ItemStatus::NeedsRevision => "Needs Revision",
            ItemStatus::FinalApproval => "Final Approval",
            ItemStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = EngageError;

    /// Accepts the wire form (`in_progress`), the label (`In Progress`) and
    /// hyphenated variants, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        ItemStatus::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == norm || (norm == "todo" && *st == ItemStatus::ToDo))
            .ok_or_else(|| EngageError::InvalidStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SprintStatus
// ---------------------------------------------------------------------------

/// Sprint lifecycle: `NotStarted → Active → Completed`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    NotStarted,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn label(self) -> &'static str {
        match self {
            SprintStatus::NotStarted => "Not Started",
            SprintStatus::Active => "Active",
            SprintStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = EngageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(EngageError::InvalidArgument(format!("unknown priority '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ItemType
// ---------------------------------------------------------------------------

/// Category tag. Affects only how an item is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Story,
    Task,
    Bug,
    Spike,
    Chore,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Story => "story",
            ItemType::Task => "task",
            ItemType::Bug => "bug",
            ItemType::Spike => "spike",
            ItemType::Chore => "chore",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = EngageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "story" => Ok(ItemType::Story),
            "task" => Ok(ItemType::Task),
            "bug" => Ok(ItemType::Bug),
            "spike" => Ok(ItemType::Spike),
            "chore" => Ok(ItemType::Chore),
            _ => Err(EngageError::InvalidArgument(format!("unknown item type '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

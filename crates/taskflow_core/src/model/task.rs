//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and its two-state status.
//! - Provide merge semantics for partial updates.
//!
//! # Invariants
//! - `title` is non-empty after trimming for every persisted task.
//! - `created_at` is set once at creation and never changes.
//! - A blank description is stored as `None`.

use crate::model::account::{now_epoch_ms, AccountId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task completion state. Closed two-value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    /// Returns the opposite status; used for completion toggling.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }

    /// Stable uppercase label, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub owner_id: AccountId,
}

impl Task {
    /// Creates a new `Pending` task owned by `owner_id`.
    ///
    /// Does not validate; callers persist through the repository, which
    /// calls [`Task::validate`].
    pub fn new(owner_id: AccountId, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: normalize_description(description),
            status: TaskStatus::Pending,
            created_at: now_epoch_ms(),
            owner_id,
        }
    }

    /// Checks persisted-state invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Partial update for an existing task. `None` fields keep prior values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    /// Patch that only changes status.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that replaces title and description, as the editor saves them.
    pub fn content(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            status: None,
        }
    }

    /// Merges supplied fields over `task`. Identity, owner and creation time
    /// are never touched.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = normalize_description(Some(description.clone()));
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// Validation failures for task input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title is required"),
        }
    }
}

impl Error for TaskValidationError {}

/// Rejects titles that are empty after trimming.
pub fn validate_title(title: &str) -> Result<(), TaskValidationError> {
    if title.trim().is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|value| !value.trim().is_empty())
}

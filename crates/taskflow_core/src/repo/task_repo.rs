//! Task repository over the `tasks` record collection.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD over persisted tasks.
//!
//! # Invariants
//! - Every call names its owner; other owners' tasks are invisible.
//! - New tasks are inserted at the front (most-recent-first order).
//! - Writes call `Task::validate()` before persisting.
//! - `update` on a missing task is `NotFound`; `delete` of one is a no-op.

use crate::error::ErrorKind;
use crate::model::account::AccountId;
use crate::model::task::{validate_title, Task, TaskId, TaskPatch, TaskValidationError};
use crate::store::{read_records, write_records, Collection, RecordStore, StoreError};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Task repository failures.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    NotFound(TaskId),
    Store(StoreError),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Owner-scoped task CRUD over an injected record store.
pub struct TaskRepository<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists `owner`'s tasks, most recently created first.
    pub fn list(&self, owner: AccountId) -> RepoResult<Vec<Task>> {
        let tasks: Vec<Task> = self
            .load_all()?
            .into_iter()
            .filter(|task| task.owner_id == owner)
            .collect();
        debug!(
            "event=task_list module=task_repo status=ok owner_id={} count={}",
            owner,
            tasks.len()
        );
        Ok(tasks)
    }

    /// Gets one of `owner`'s tasks by id.
    pub fn get(&self, owner: AccountId, id: TaskId) -> RepoResult<Option<Task>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|task| task.id == id && task.owner_id == owner))
    }

    /// Creates a `Pending` task at the front of the collection.
    ///
    /// # Errors
    /// - `Validation(EmptyTitle)` for a blank title; nothing is written.
    pub fn create(
        &self,
        owner: AccountId,
        title: &str,
        description: Option<&str>,
    ) -> RepoResult<Task> {
        validate_title(title)?;
        let task = Task::new(owner, title, description.map(str::to_string));
        task.validate()?;

        let mut tasks = self.load_all()?;
        tasks.insert(0, task.clone());
        self.save_all(&tasks)?;

        info!(
            "event=task_create module=task_repo status=ok owner_id={} task_id={}",
            owner, task.id
        );
        Ok(task)
    }

    /// Merges `patch` into one of `owner`'s tasks and returns the result.
    ///
    /// # Errors
    /// - `NotFound` when `owner` has no task `id`.
    /// - `Validation` when the merged title is blank; nothing is written.
    pub fn update(&self, owner: AccountId, id: TaskId, patch: &TaskPatch) -> RepoResult<Task> {
        let mut tasks = self.load_all()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id && task.owner_id == owner)
            .ok_or(RepoError::NotFound(id))?;

        let mut merged = task.clone();
        patch.apply_to(&mut merged);
        merged.validate()?;
        *task = merged.clone();
        self.save_all(&tasks)?;

        info!(
            "event=task_update module=task_repo status=ok owner_id={} task_id={} status_value={}",
            owner,
            id,
            merged.status.as_str()
        );
        Ok(merged)
    }

    /// Removes one of `owner`'s tasks. Missing ids are not an error.
    pub fn delete(&self, owner: AccountId, id: TaskId) -> RepoResult<()> {
        let mut tasks = self.load_all()?;
        let before = tasks.len();
        tasks.retain(|task| !(task.id == id && task.owner_id == owner));

        if tasks.len() == before {
            debug!(
                "event=task_delete module=task_repo status=ok owner_id={} task_id={} removed=0",
                owner, id
            );
            return Ok(());
        }

        self.save_all(&tasks)?;
        info!(
            "event=task_delete module=task_repo status=ok owner_id={} task_id={} removed=1",
            owner, id
        );
        Ok(())
    }

    fn load_all(&self) -> RepoResult<Vec<Task>> {
        Ok(read_records(&self.store, Collection::Tasks)?)
    }

    fn save_all(&self, tasks: &[Task]) -> RepoResult<()> {
        Ok(write_records(&self.store, Collection::Tasks, tasks)?)
    }
}

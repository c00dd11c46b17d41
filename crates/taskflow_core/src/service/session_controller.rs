//! Client session controller.
//!
//! # Responsibility
//! - Hold the cached account and task list the UI renders from.
//! - Route UI intents to the directory, repository and advisor.
//! - Own the single in-flight task draft and the last AI insight.
//!
//! # Invariants
//! - Every successful mutation invalidates the affected cache and reloads it
//!   from the store; results are never patched into the cache.
//! - A failed mutation leaves every cache untouched.
//! - A mutation that reached the store reports success even when the reload
//!   after it fails; the task cache then stays stale until the next read.
//! - At most one draft is open; opening another discards the previous one.
//! - Mutations take `&mut self`, so two never run at once.

use crate::ai::advisor::{Advisor, AdvisorError};
use crate::ai::completion::CompletionCapability;
use crate::error::ErrorKind;
use crate::model::account::{Account, AccountId};
use crate::model::task::{validate_title, Task, TaskId, TaskPatch, TaskValidationError};
use crate::repo::account_repo::{AccountDirectory, DirectoryError};
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::store::RecordStore;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Controller-level failure. Wraps lower-layer errors unchanged.
#[derive(Debug)]
pub enum SessionError {
    NotAuthenticated,
    Validation(TaskValidationError),
    NoActiveEditor,
    SuggestionOutOfRange(usize),
    Directory(DirectoryError),
    Repo(RepoError),
    Advisor(AdvisorError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NoActiveEditor | Self::SuggestionOutOfRange(_) => ErrorKind::NotFound,
            Self::Directory(err) => err.kind(),
            Self::Repo(err) => err.kind(),
            Self::Advisor(err) => err.kind(),
        }
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "sign in required"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoActiveEditor => write!(f, "no task is being edited"),
            Self::SuggestionOutOfRange(index) => write!(f, "no suggestion at index {index}"),
            Self::Directory(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Advisor(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Directory(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Advisor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for SessionError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DirectoryError> for SessionError {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<AdvisorError> for SessionError {
    fn from(value: AdvisorError) -> Self {
        Self::Advisor(value)
    }
}

/// Unsaved edit state for one new or existing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    task_id: Option<TaskId>,
    title: String,
    description: String,
    suggestions: Vec<String>,
}

impl TaskDraft {
    fn blank() -> Self {
        Self {
            task_id: None,
            title: String::new(),
            description: String::new(),
            suggestions: Vec::new(),
        }
    }

    fn from_task(task: &Task) -> Self {
        Self {
            task_id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            suggestions: Vec::new(),
        }
    }

    /// `None` while drafting a new task.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current AI suggestion set, in provider order.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn append_subtask(&mut self, subtask: &str) {
        if self.description.is_empty() {
            self.description = format!("- {subtask}");
        } else {
            self.description = format!("{}\n- {subtask}", self.description);
        }
    }
}

/// UI-facing orchestrator over the directory, task repository and advisor.
pub struct SessionController<S: RecordStore, C: CompletionCapability> {
    directory: AccountDirectory<S>,
    repo: TaskRepository<S>,
    advisor: Advisor<C>,
    account: Option<Account>,
    /// `None` means invalidated and not yet reloaded.
    tasks: Option<Vec<Task>>,
    draft: Option<TaskDraft>,
    insight: Option<String>,
}

impl<S: RecordStore, C: CompletionCapability> SessionController<S, C> {
    pub fn new(directory: AccountDirectory<S>, repo: TaskRepository<S>, advisor: Advisor<C>) -> Self {
        Self {
            directory,
            repo,
            advisor,
            account: None,
            tasks: None,
            draft: None,
            insight: None,
        }
    }

    /// Loads the signed-in account and its tasks from storage.
    pub fn bootstrap(&mut self) -> SessionResult<()> {
        self.refresh_account()?;
        self.refresh_tasks()
    }

    /// Reloads the cached account from the persisted session token.
    pub fn refresh_account(&mut self) -> SessionResult<()> {
        let account = self.directory.current_account()?;
        let owner_changed =
            account.as_ref().map(|a| a.id) != self.account.as_ref().map(|a| a.id);
        self.account = account;
        if owner_changed {
            self.tasks = None;
            self.draft = None;
            self.insight = None;
        }
        Ok(())
    }

    /// Reloads the cached task list for the current account.
    ///
    /// Signed out, the list is empty.
    pub fn refresh_tasks(&mut self) -> SessionResult<()> {
        let tasks = match &self.account {
            Some(account) => self.repo.list(account.id)?,
            None => Vec::new(),
        };
        debug!(
            "event=cache_refresh module=session status=ok cache=tasks count={}",
            tasks.len()
        );
        self.tasks = Some(tasks);
        Ok(())
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Cached tasks, most recent first. Empty while invalidated.
    pub fn tasks(&self) -> &[Task] {
        self.tasks.as_deref().unwrap_or(&[])
    }

    /// Whether the task cache was invalidated and not reloaded.
    pub fn tasks_are_stale(&self) -> bool {
        self.tasks.is_none()
    }

    pub fn pending_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks().iter().filter(|task| !task.is_completed())
    }

    pub fn completed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks().iter().filter(|task| task.is_completed())
    }

    pub fn register(&mut self, name: &str, email: &str, password: &str) -> SessionResult<Account> {
        let result = self.directory.register(name, email, password);
        let (account, _token) = self.settle("register", result)?;
        self.reload_after_auth()?;
        Ok(account)
    }

    pub fn login(&mut self, email: &str, password: &str) -> SessionResult<Account> {
        let result = self.directory.login(email, password);
        let (account, _token) = self.settle("login", result)?;
        self.reload_after_auth()?;
        Ok(account)
    }

    /// Signs out and clears every session-bound cache.
    pub fn logout(&mut self) -> SessionResult<()> {
        let result = self.directory.logout();
        self.settle("logout", result)?;
        self.reload_after_auth()
    }

    /// Creates a task for the signed-in account.
    ///
    /// # Errors
    /// - `Validation` for a blank title, checked before the repository call.
    /// - `NotAuthenticated` when signed out.
    pub fn create_task(&mut self, title: &str, description: &str) -> SessionResult<Task> {
        validate_title(title)?;
        let owner = self.require_account()?;
        let result = self.repo.create(owner, title, Some(description));
        let task = self.settle("create_task", result)?;
        self.invalidate_tasks("create_task");
        Ok(task)
    }

    /// Applies a partial update to one of the signed-in account's tasks.
    pub fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> SessionResult<Task> {
        let owner = self.require_account()?;
        let result = self.repo.update(owner, id, patch);
        let task = self.settle("update_task", result)?;
        self.invalidate_tasks("update_task");
        Ok(task)
    }

    /// Flips a task between pending and completed.
    pub fn toggle_task(&mut self, id: TaskId) -> SessionResult<Task> {
        let status = self.cached_task(id)?.status;
        self.update_task(id, &TaskPatch::status(status.toggled()))
    }

    /// Deletes a task. Unknown ids succeed.
    ///
    /// Closes the editor when it holds the deleted task.
    pub fn delete_task(&mut self, id: TaskId) -> SessionResult<()> {
        let owner = self.require_account()?;
        let result = self.repo.delete(owner, id);
        self.settle("delete_task", result)?;
        if self.draft.as_ref().and_then(TaskDraft::task_id) == Some(id) {
            self.draft = None;
        }
        self.invalidate_tasks("delete_task");
        Ok(())
    }

    /// Opens a blank draft, discarding any open one.
    pub fn open_new_task(&mut self) {
        self.draft = Some(TaskDraft::blank());
    }

    /// Opens a draft for a cached task, discarding any open one.
    pub fn open_task_editor(&mut self, id: TaskId) -> SessionResult<&TaskDraft> {
        let draft = TaskDraft::from_task(self.cached_task(id)?);
        Ok(self.draft.insert(draft))
    }

    pub fn editor(&self) -> Option<&TaskDraft> {
        self.draft.as_ref()
    }

    /// Discards the open draft and its suggestions.
    pub fn close_editor(&mut self) {
        self.draft = None;
    }

    pub fn set_draft_title(&mut self, title: &str) -> SessionResult<()> {
        self.draft_mut()?.title = title.to_string();
        Ok(())
    }

    pub fn set_draft_description(&mut self, description: &str) -> SessionResult<()> {
        self.draft_mut()?.description = description.to_string();
        Ok(())
    }

    /// Asks the advisor for subtasks of the open draft and stores them.
    ///
    /// On failure the previous suggestion set is kept.
    pub fn suggest_subtasks(&mut self) -> SessionResult<&[String]> {
        let draft = self.draft.as_ref().ok_or(SessionError::NoActiveEditor)?;
        validate_title(&draft.title)?;

        let result = self
            .advisor
            .suggest_subtasks(&draft.title, &draft.description);
        let suggestions = self.settle("suggest_subtasks", result)?;

        let draft = self.draft_mut()?;
        draft.suggestions = suggestions;
        Ok(&draft.suggestions)
    }

    /// Moves one suggestion into the draft description as a `- ` line.
    pub fn accept_suggestion(&mut self, index: usize) -> SessionResult<()> {
        let draft = self.draft_mut()?;
        if index >= draft.suggestions.len() {
            return Err(SessionError::SuggestionOutOfRange(index));
        }
        let subtask = draft.suggestions.remove(index);
        draft.append_subtask(&subtask);
        Ok(())
    }

    /// Persists the open draft as a new task or an update, then closes it.
    ///
    /// The draft stays open when saving fails.
    pub fn save_editor(&mut self) -> SessionResult<Task> {
        let draft = self.draft.clone().ok_or(SessionError::NoActiveEditor)?;
        let task = match draft.task_id {
            Some(id) => self.update_task(id, &TaskPatch::content(draft.title, draft.description))?,
            None => self.create_task(&draft.title, &draft.description)?,
        };
        self.draft = None;
        Ok(task)
    }

    /// Requests a focus summary for the current task list and keeps it as
    /// the active insight.
    pub fn prioritize(&mut self) -> SessionResult<&str> {
        self.require_account()?;
        if self.tasks_are_stale() {
            self.refresh_tasks()?;
        }

        let result = self.advisor.prioritize(self.tasks());
        let insight = self.settle("prioritize", result)?;
        Ok(self.insight.insert(insight).as_str())
    }

    pub fn insight(&self) -> Option<&str> {
        self.insight.as_deref()
    }

    pub fn dismiss_insight(&mut self) {
        self.insight = None;
    }

    fn require_account(&self) -> SessionResult<AccountId> {
        self.account
            .as_ref()
            .map(|account| account.id)
            .ok_or(SessionError::NotAuthenticated)
    }

    fn draft_mut(&mut self) -> SessionResult<&mut TaskDraft> {
        self.draft.as_mut().ok_or(SessionError::NoActiveEditor)
    }

    /// Looks `id` up in the task cache, reloading it first when stale.
    fn cached_task(&mut self, id: TaskId) -> SessionResult<&Task> {
        if self.tasks_are_stale() {
            self.refresh_tasks()?;
        }
        self.tasks()
            .iter()
            .find(|task| task.id == id)
            .ok_or(SessionError::Repo(RepoError::NotFound(id)))
    }

    /// Drops the task cache after a stored mutation and reloads it.
    ///
    /// A failed reload is logged and leaves the cache stale; the mutation
    /// itself already succeeded.
    fn invalidate_tasks(&mut self, operation: &str) {
        self.tasks = None;
        if let Err(err) = self.refresh_tasks() {
            warn!(
                "event=cache_refresh module=session status=degraded cache=tasks operation={} error_code={}",
                operation,
                err.kind().as_str()
            );
        } else {
            info!(
                "event=session_op module=session status=ok operation={}",
                operation
            );
        }
    }

    fn reload_after_auth(&mut self) -> SessionResult<()> {
        self.account = None;
        self.tasks = None;
        self.draft = None;
        self.insight = None;
        self.refresh_account()?;
        self.refresh_tasks()
    }

    /// Converts a lower-layer result and logs failures with their kind.
    fn settle<T, E>(&self, operation: &str, result: Result<T, E>) -> SessionResult<T>
    where
        E: Into<SessionError>,
    {
        result.map_err(|err| {
            let err = err.into();
            warn!(
                "event=session_op module=session status=error operation={} error_code={}",
                operation,
                err.kind().as_str()
            );
            err
        })
    }
}

//! Core domain logic for Taskflow.
//! This crate is the single source of truth for business invariants.

pub mod ai;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use ai::advisor::{Advisor, AdvisorError, PRIORITIZE_FALLBACK};
pub use ai::completion::{CompletionCapability, CompletionError, CompletionRequest, ResponseShape};
pub use error::ErrorKind;
pub use logging::{default_log_level, init_logging};
pub use model::account::{Account, AccountId, SessionToken};
pub use model::task::{Task, TaskId, TaskPatch, TaskStatus, TaskValidationError};
pub use repo::account_repo::{
    AcceptAnyCredential, AccountDirectory, CredentialVerifier, DirectoryError, DirectoryResult,
};
pub use repo::task_repo::{RepoError, RepoResult, TaskRepository};
pub use service::session_controller::{SessionController, SessionError, SessionResult, TaskDraft};
pub use store::{
    read_records, write_records, Collection, MemoryRecordStore, Record, RecordStore,
    SqliteRecordStore, StoreError, StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

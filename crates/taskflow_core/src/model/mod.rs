//! Domain records shared by storage, repositories and the session controller.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Tasks are hard-deleted; there is no tombstone state.

pub mod account;
pub mod task;

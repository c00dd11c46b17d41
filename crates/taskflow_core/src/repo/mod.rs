//! Repository layer over the record store.
//!
//! # Responsibility
//! - Define use-case oriented data access for accounts and tasks.
//! - Keep record encoding details away from the session controller.
//!
//! # Invariants
//! - Repositories receive their store by injection, never from globals.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateAccount`)
//!   in addition to storage errors.

pub mod account_repo;
pub mod task_repo;

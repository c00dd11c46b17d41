//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and advisor calls into UI-level operations.
//! - Keep presentation code decoupled from storage details.

pub mod session_controller;

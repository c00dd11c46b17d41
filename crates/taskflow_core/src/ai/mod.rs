//! AI-assisted helpers built on an abstract completion capability.

pub mod advisor;
pub mod completion;

//! Cross-layer error classification.
//!
//! Each layer keeps its own error enum; `ErrorKind` is the coarse category
//! the presentation layer switches on when rendering a failure.

/// Caller-facing failure category. Every kind is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Registration email already in use.
    DuplicateAccount,
    /// Login rejected.
    InvalidCredentials,
    /// Input failed validation, e.g. an empty task title.
    Validation,
    /// Referenced record does not exist.
    NotFound,
    /// The completion capability call failed.
    AiUnavailable,
    /// Operation needs a signed-in account.
    NotAuthenticated,
    /// Persistence backend failure or corrupt stored data.
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateAccount => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::AiUnavailable => "ai_unavailable",
            Self::NotAuthenticated => "not_authenticated",
            Self::Storage => "storage",
        }
    }
}

//! Completion capability contract.
//!
//! Providers bind this to a concrete text-generation service. The core only
//! sees a prompt going in and text or a failure coming out; model choice,
//! transport and timeouts belong to the implementation.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Output shape the caller asks the provider to constrain itself to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Free text.
    Text,
    /// A bare JSON array of strings, no markdown.
    JsonStringArray,
}

/// One completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub shape: ResponseShape,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            shape: ResponseShape::Text,
        }
    }

    pub fn json_string_array(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            shape: ResponseShape::JsonStringArray,
        }
    }
}

/// Provider-side failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Network or transport failure before a response was received.
    Transport(String),
    /// Provider answered with an error (auth, quota, model refusal).
    Provider(String),
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "completion transport failed: {message}"),
            Self::Provider(message) => write!(f, "completion provider error: {message}"),
        }
    }
}

impl Error for CompletionError {}

/// Text-generation capability used by the advisor.
///
/// An empty string means the provider produced no text.
pub trait CompletionCapability {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Provider name for logging.
    fn name(&self) -> &str {
        "completion"
    }
}

impl<C: CompletionCapability + ?Sized> CompletionCapability for &C {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<C: CompletionCapability + ?Sized> CompletionCapability for Arc<C> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<C: CompletionCapability + ?Sized> CompletionCapability for Box<C> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! AI advisor: subtask suggestions and task-list prioritization.
//!
//! # Responsibility
//! - Build prompts for the two advisor use-cases.
//! - Parse loosely structured provider output into typed results.
//!
//! # Invariants
//! - Provider failure is always `AdvisorError::Unavailable`, never data.
//! - Unparseable subtask output degrades to an empty list.
//! - Blank prioritization output is replaced by `PRIORITIZE_FALLBACK`.
//! - One round trip per call; no retries.
//! - Prompts and responses are never logged, only sizes.

use crate::ai::completion::{CompletionCapability, CompletionError, CompletionRequest};
use crate::error::ErrorKind;
use crate::logging::log_field;
use crate::model::task::Task;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Returned by `prioritize` when the provider yields no text.
pub const PRIORITIZE_FALLBACK: &str = "Could not analyze tasks.";

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Advisor failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    Unavailable(CompletionError),
}

impl AdvisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::AiUnavailable,
        }
    }
}

impl Display for AdvisorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "AI is currently unavailable: {err}"),
        }
    }
}

impl Error for AdvisorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
        }
    }
}

/// AI advisor over an injected completion capability.
pub struct Advisor<C: CompletionCapability> {
    completion: C,
}

impl<C: CompletionCapability> Advisor<C> {
    pub fn new(completion: C) -> Self {
        Self { completion }
    }

    /// Suggests concrete subtasks for a task being drafted.
    ///
    /// Returns an empty list when the provider output is empty or is not a
    /// JSON array.
    pub fn suggest_subtasks(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<String>, AdvisorError> {
        let request = CompletionRequest::json_string_array(subtask_prompt(title, description));
        let text = self.call("suggest_subtasks", &request)?;
        let suggestions = parse_suggestions(&text);
        if suggestions.is_empty() && !text.trim().is_empty() {
            warn!(
                "event=ai_suggest module=advisor status=degraded response_chars={} error_code=unparseable_response",
                text.chars().count()
            );
        }
        Ok(suggestions)
    }

    /// Produces a short focus recommendation for `tasks`.
    pub fn prioritize(&self, tasks: &[Task]) -> Result<String, AdvisorError> {
        let request = CompletionRequest::text(prioritize_prompt(tasks));
        let text = self.call("prioritize", &request)?;
        if text.trim().is_empty() {
            return Ok(PRIORITIZE_FALLBACK.to_string());
        }
        Ok(text)
    }

    fn call(&self, operation: &str, request: &CompletionRequest) -> Result<String, AdvisorError> {
        let started_at = Instant::now();
        match self.completion.complete(request) {
            Ok(text) => {
                info!(
                    "event=ai_call module=advisor status=ok operation={} provider={} prompt_chars={} response_chars={} duration_ms={}",
                    operation,
                    self.completion.name(),
                    request.prompt.chars().count(),
                    text.chars().count(),
                    started_at.elapsed().as_millis()
                );
                Ok(text)
            }
            Err(err) => {
                warn!(
                    "event=ai_call module=advisor status=error operation={} provider={} duration_ms={} error={}",
                    operation,
                    self.completion.name(),
                    started_at.elapsed().as_millis(),
                    log_field(&err.to_string())
                );
                Err(AdvisorError::Unavailable(err))
            }
        }
    }
}

/// Prompt asking for 3-5 actionable subtasks as a bare JSON string array.
pub fn subtask_prompt(title: &str, description: &str) -> String {
    format!(
        "I have a task: \"{title}\".\n\
         Description: \"{description}\".\n\n\
         Please suggest 3-5 concrete, actionable subtasks to help complete this task.\n\
         Return ONLY a JSON array of strings. Do not include markdown formatting."
    )
}

/// Prompt listing each task with its status and asking for a focus summary.
pub fn prioritize_prompt(tasks: &[Task]) -> String {
    let task_list = tasks
        .iter()
        .map(|task| format!("- {} ({})", task.title, task.status.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Here is my current task list:\n{task_list}\n\n\
         Analyze these tasks and provide a short, encouraging summary (max 100 words) \
         on what I should focus on first and why. Be a helpful productivity assistant."
    )
}

/// Parses provider output into suggestions.
///
/// Accepts a JSON array, optionally wrapped in a markdown code fence.
/// Non-string elements and blank strings are dropped; anything that is not
/// an array yields an empty list.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    let body = CODE_FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(value) => {
                    let trimmed = value.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

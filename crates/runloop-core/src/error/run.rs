//! Caller-facing errors of one orchestrated run.

use super::TransportError;
use crate::identifiers::{CallId, RunId, ThreadId};
use crate::run::RunStatus;
use std::fmt;
use thiserror::Error;

/// Identifies the run an error belongs to, so a caller can inspect or retry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub thread_id: ThreadId,
    /// Absent when the failure happened before the run was created
    pub run_id: Option<RunId>,
}

impl RunContext {
    pub fn new(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            run_id: None,
        }
    }

    pub fn with_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.run_id {
            Some(run_id) => write!(f, "thread {} run {}", self.thread_id, run_id),
            None => write!(f, "thread {}", self.thread_id),
        }
    }
}

/// A tool output batch that does not answer its requests exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "tool outputs do not cover the requested calls (missing: {missing:?}, duplicated: {duplicated:?}, unexpected: {unexpected:?})"
)]
pub struct OutputCoverageError {
    pub missing: Vec<CallId>,
    pub duplicated: Vec<CallId>,
    pub unexpected: Vec<CallId>,
}

/// Result type for orchestrated runs
pub type RunResult<T> = Result<T, RunError>;

/// Failure of a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Creating the message or run failed, or fetching the final messages failed
    #[error("Transport failure on {context}: {source}")]
    Transport {
        context: RunContext,
        #[source]
        source: TransportError,
    },

    /// Attempt budget spent without reaching a terminal status
    #[error("Run did not finish on {context} after {attempts} attempt(s); last status {last_status:?}")]
    Timeout {
        context: RunContext,
        attempts: u32,
        last_status: Option<RunStatus>,
        last_error: Option<String>,
    },

    /// Run reached failed, cancelled, expired or incomplete
    #[error("Run ended as {status} on {context}")]
    RunFailed {
        context: RunContext,
        status: RunStatus,
        last_error: Option<String>,
    },

    /// Final assistant text did not match the expected result shape
    #[error("Could not decode assistant reply on {context}: {source}")]
    Decode {
        context: RunContext,
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Run completed on {context} but no assistant message was found")]
    NoAssistantMessage { context: RunContext },

    /// Dispatch produced a batch that would leave call ids unanswered
    #[error("Refusing to submit incomplete tool outputs on {context}: {source}")]
    IncompleteOutputs {
        context: RunContext,
        #[source]
        source: OutputCoverageError,
    },

    #[error("Run cancelled on {context}")]
    Cancelled { context: RunContext },

    /// The async runtime could not be used (e.g. blocking call inside a runtime)
    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl RunError {
    pub fn transport(context: RunContext, source: TransportError) -> Self {
        Self::Transport { context, source }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Thread and run the error refers to, if any
    pub fn context(&self) -> Option<&RunContext> {
        match self {
            RunError::Transport { context, .. }
            | RunError::Timeout { context, .. }
            | RunError::RunFailed { context, .. }
            | RunError::Decode { context, .. }
            | RunError::NoAssistantMessage { context }
            | RunError::IncompleteOutputs { context, .. }
            | RunError::Cancelled { context } => Some(context),
            RunError::Runtime { .. } => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RunError::Transport { .. } => "transport",
            RunError::Timeout { .. } => "timeout",
            RunError::RunFailed { .. } => "run_failed",
            RunError::Decode { .. } => "decode",
            RunError::NoAssistantMessage { .. } => "no_assistant_message",
            RunError::IncompleteOutputs { .. } => "incomplete_outputs",
            RunError::Cancelled { .. } => "cancelled",
            RunError::Runtime { .. } => "runtime",
        }
    }
}

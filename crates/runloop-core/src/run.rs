//! Remote run lifecycle as seen by the orchestrator.

use crate::collections::NonEmptyVec;
use crate::identifiers::{RunId, ThreadId};
use crate::tool::ToolCallRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the remote service for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// No further transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Completed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    /// The run is progressing on its own; wait and poll again
    pub fn is_polling(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    /// The run is blocked until tool outputs are submitted
    pub fn requires_action(&self) -> bool {
        matches!(self, RunStatus::RequiresAction)
    }

    /// Terminal, but not `completed`
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != RunStatus::Completed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one remote run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHandle {
    pub run_id: RunId,
    pub thread_id: ThreadId,
    pub status: RunStatus,
    /// Tool calls the run waits on; only meaningful in `requires_action`
    pub required_action: Option<NonEmptyVec<ToolCallRequest>>,
    /// Remote-provided failure description, if any
    pub last_error: Option<String>,
}

impl RunHandle {
    pub fn new(run_id: RunId, thread_id: ThreadId, status: RunStatus) -> Self {
        Self {
            run_id,
            thread_id,
            status,
            required_action: None,
            last_error: None,
        }
    }

    pub fn with_tool_calls(mut self, calls: NonEmptyVec<ToolCallRequest>) -> Self {
        self.required_action = Some(calls);
        self
    }

    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    /// Pending tool calls, if the run is waiting on any
    pub fn pending_calls(&self) -> Option<&NonEmptyVec<ToolCallRequest>> {
        if self.status.requires_action() {
            self.required_action.as_ref()
        } else {
            None
        }
    }
}

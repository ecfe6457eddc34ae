//! Per-call dispatch failures and their wire payload.

use super::CoercionError;
use crate::tool::MalformedArguments;
use serde_json::json;
use thiserror::Error;

/// Why one tool call did not produce a result.
///
/// These never abort a batch. Each is turned into an output payload so the
/// run still receives an answer for the call id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No tool registered under `{tool}`")]
    ToolNotFound { tool: String },

    #[error("Tool `{tool}` received undecodable arguments: {source}")]
    MalformedArguments {
        tool: String,
        #[source]
        source: MalformedArguments,
    },

    #[error("Tool `{tool}`: {source}")]
    Binding {
        tool: String,
        #[source]
        source: CoercionError,
    },

    /// Handler ran and returned an error
    #[error("Tool `{tool}` failed: {message}")]
    Handler { tool: String, message: String },

    #[error("Tool `{tool}` panicked: {message}")]
    Panicked { tool: String, message: String },

    #[error("Tool `{tool}` timed out after {timeout_ms}ms")]
    TimedOut { tool: String, timeout_ms: u64 },

    #[error("Tool `{tool}` was cancelled")]
    Cancelled { tool: String },
}

impl DispatchError {
    /// Stable machine-readable kind carried in the payload
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::ToolNotFound { .. } => "tool_not_found",
            DispatchError::MalformedArguments { .. } => "malformed_arguments",
            DispatchError::Binding { .. } => "invalid_argument",
            DispatchError::Handler { .. } => "handler_error",
            DispatchError::Panicked { .. } => "panicked",
            DispatchError::TimedOut { .. } => "timed_out",
            DispatchError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            DispatchError::ToolNotFound { tool }
            | DispatchError::MalformedArguments { tool, .. }
            | DispatchError::Binding { tool, .. }
            | DispatchError::Handler { tool, .. }
            | DispatchError::Panicked { tool, .. }
            | DispatchError::TimedOut { tool, .. }
            | DispatchError::Cancelled { tool } => tool,
        }
    }

    /// Render as `{"error":{"kind":..,"tool":..,"message":..}}`
    pub fn to_payload(&self) -> String {
        json!({
            "error": {
                "kind": self.kind(),
                "tool": self.tool(),
                "message": self.to_string(),
            }
        })
        .to_string()
    }
}

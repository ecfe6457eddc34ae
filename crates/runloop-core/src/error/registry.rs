//! Errors detected while building a tool registry.

use crate::identifiers::IdValidationError;
use thiserror::Error;

/// Registration problems. All of them are reported at startup, never at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool `{name}` is registered more than once")]
    DuplicateTool { name: String },

    #[error("Invalid tool name `{name}`: {source}")]
    InvalidToolName {
        name: String,
        #[source]
        source: IdValidationError,
    },

    /// Declared parameter names do not match the handler's arity
    #[error("Tool `{tool}` declares {declared} parameter name(s) but its handler takes {expected}")]
    ArityMismatch {
        tool: String,
        declared: usize,
        expected: usize,
    },

    #[error("Tool `{tool}` declares parameter `{parameter}` more than once")]
    DuplicateParameter { tool: String, parameter: String },
}

/// Result type for registry construction
pub type RegistryResult<T> = Result<T, RegistryError>;

//! Errors converting a raw argument value into a handler parameter type.

use serde_json::Value;
use thiserror::Error;

/// A single argument could not be bound to its declared parameter.
///
/// Every variant names the parameter and, where there is one, the raw value
/// that was rejected. Nothing is ever silently defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Missing required parameter `{parameter}`")]
    MissingParameter { parameter: String },

    #[error("Parameter `{parameter}`: cannot read {raw} as {expected}: {reason}")]
    InvalidValue {
        parameter: String,
        raw: String,
        expected: String,
        reason: String,
    },

    #[error("Parameter `{parameter}`: {raw} is not one of [{}]", allowed.join(", "))]
    UnknownVariant {
        parameter: String,
        raw: String,
        allowed: Vec<String>,
    },
}

impl CoercionError {
    pub fn missing(parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
        }
    }

    /// Create an invalid value error, rendering the raw value as JSON text
    pub fn invalid(
        parameter: impl Into<String>,
        raw: &Value,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            parameter: parameter.into(),
            raw: raw.to_string(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_variant(parameter: impl Into<String>, raw: &Value, allowed: &[&str]) -> Self {
        Self::UnknownVariant {
            parameter: parameter.into(),
            raw: raw.to_string(),
            allowed: allowed.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    pub fn parameter(&self) -> &str {
        match self {
            CoercionError::MissingParameter { parameter }
            | CoercionError::InvalidValue { parameter, .. }
            | CoercionError::UnknownVariant { parameter, .. } => parameter,
        }
    }

    /// Rename the parameter, used when an element error bubbles out of a list
    pub fn with_parameter(self, name: impl Into<String>) -> Self {
        let name = name.into();
        match self {
            CoercionError::MissingParameter { .. } => Self::MissingParameter { parameter: name },
            CoercionError::InvalidValue {
                raw,
                expected,
                reason,
                ..
            } => Self::InvalidValue {
                parameter: name,
                raw,
                expected,
                reason,
            },
            CoercionError::UnknownVariant { raw, allowed, .. } => Self::UnknownVariant {
                parameter: name,
                raw,
                allowed,
            },
        }
    }
}

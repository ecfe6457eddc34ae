//! Validated identifier types.
//!
//! Every identifier the remote service hands out (threads, runs, assistants,
//! messages, tool calls) and every locally registered tool name is wrapped in
//! its own newtype. The types are deliberately incompatible with each other:
//! a [`ThreadId`] cannot be passed where an [`AssistantId`] is expected, so
//! mixing up which id goes into which request fails to compile.
//!
//! # Examples
//!
//! ```rust
//! use runloop_core::identifiers::{ThreadId, ToolName};
//!
//! let thread = ThreadId::parse("thread_abc123").unwrap();
//! assert_eq!(thread.as_str(), "thread_abc123");
//!
//! assert!(ToolName::parse("evaluate_position").is_ok());
//! assert!(ToolName::parse("not a tool").is_err());
//! assert!(ThreadId::parse("").is_err());
//! ```

mod validation;

pub use validation::{
    IdValidationError, IdentifierRules, MAX_REMOTE_ID_LENGTH, MAX_TOOL_NAME_LENGTH,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! validated_id {
    ($(#[$meta:meta])* $name:ident, $rules:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier from a string
            pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                $rules.validate(id.as_ref()).map(|s| Self(s.to_string()))
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Create an identifier without validation (for tests only)
            #[doc(hidden)]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $rules.validate(&value)?;
                Ok(Self(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_id!(
    /// Identifier of a conversation thread on the remote service.
    ThreadId,
    IdentifierRules::REMOTE_ID
);

validated_id!(
    /// Identifier of one remote run.
    RunId,
    IdentifierRules::REMOTE_ID
);

validated_id!(
    /// Identifier of the remote assistant a run executes.
    AssistantId,
    IdentifierRules::REMOTE_ID
);

validated_id!(
    /// Identifier of a message inside a thread.
    MessageId,
    IdentifierRules::REMOTE_ID
);

validated_id!(
    /// Identifier of one requested tool call, unique within its dispatch batch.
    CallId,
    IdentifierRules::REMOTE_ID
);

validated_id!(
    /// Logical name a tool handler is registered and invoked under.
    ToolName,
    IdentifierRules::TOOL_NAME
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let run = RunId::parse("run_42").unwrap();
        assert_eq!(run.to_string(), "run_42");
        assert_eq!(String::from(run), "run_42");
    }

    #[test]
    fn from_str_uses_validation() {
        let call: Result<CallId, _> = "call abc".parse();
        assert!(matches!(
            call,
            Err(IdValidationError::InvalidCharacter { character: ' ' })
        ));
    }

    #[test]
    fn serde_rejects_invalid_ids() {
        let ok: ThreadId = serde_json::from_str("\"thread_1\"").unwrap();
        assert_eq!(ok.as_str(), "thread_1");

        let bad: Result<ThreadId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn tool_names_follow_function_name_rules() {
        assert!(ToolName::parse("get-weather_v2").is_ok());
        assert!(ToolName::parse("pkg.tool").is_err());
        assert!(ToolName::parse(&"x".repeat(65)).is_err());
    }
}

//! Identifier validation rules and utilities

use std::fmt;

/// Maximum length for identifiers issued by the remote service
pub const MAX_REMOTE_ID_LENGTH: usize = 128;

/// Maximum length for tool names (the remote function-name limit)
pub const MAX_TOOL_NAME_LENGTH: usize = 64;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier string is empty
    Empty,
    /// The identifier has leading or trailing whitespace
    LeadingTrailingWhitespace,
    /// The identifier contains a character outside the allowed set
    InvalidCharacter { character: char },
    /// The identifier exceeds the maximum length
    TooLong { length: usize, max: usize },
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Identifier cannot be empty"),
            Self::LeadingTrailingWhitespace => {
                write!(f, "Identifier cannot have leading or trailing whitespace")
            }
            Self::InvalidCharacter { character } => {
                write!(f, "Identifier contains invalid character {:?}", character)
            }
            Self::TooLong { length, max } => {
                write!(f, "Identifier too long ({} chars, max {})", length, max)
            }
        }
    }
}

impl std::error::Error for IdValidationError {}

/// Validation rules for a family of identifiers
#[derive(Debug, Clone, Copy)]
pub struct IdentifierRules {
    /// Maximum allowed length in characters
    pub max_length: usize,
    /// Whether to allow dots (.) in the identifier
    pub allow_dots: bool,
}

impl IdentifierRules {
    /// Rules for thread, run, assistant, message and call ids.
    ///
    /// - Max length: 128 characters
    /// - Allows: ASCII alphanumeric, `_`, `-`, `.`
    pub const REMOTE_ID: Self = Self {
        max_length: MAX_REMOTE_ID_LENGTH,
        allow_dots: true,
    };

    /// Rules for tool names.
    ///
    /// Matches the remote function-name pattern `^[a-zA-Z0-9_-]{1,64}$`.
    pub const TOOL_NAME: Self = Self {
        max_length: MAX_TOOL_NAME_LENGTH,
        allow_dots: false,
    };

    fn is_valid_char(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || (self.allow_dots && c == '.')
    }

    /// Validate `id` against these rules, returning the input on success.
    pub fn validate<'a>(&self, id: &'a str) -> Result<&'a str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }

        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }

        let length = id.chars().count();
        if length > self.max_length {
            return Err(IdValidationError::TooLong {
                length,
                max: self.max_length,
            });
        }

        if let Some(character) = id.chars().find(|c| !self.is_valid_char(*c)) {
            return Err(IdValidationError::InvalidCharacter { character });
        }

        // "." and ".." would be read as relative path segments
        if id.chars().all(|c| c == '.') {
            return Err(IdValidationError::InvalidCharacter { character: '.' });
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_ids_accept_service_shapes() {
        let rules = IdentifierRules::REMOTE_ID;
        assert!(rules.validate("thread_abc123").is_ok());
        assert!(rules.validate("run_Xy-9").is_ok());
        assert!(rules.validate("asst.v2").is_ok());
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(
            IdentifierRules::REMOTE_ID.validate(""),
            Err(IdValidationError::Empty)
        );
    }

    #[test]
    fn test_validate_whitespace() {
        assert_eq!(
            IdentifierRules::REMOTE_ID.validate(" run_1"),
            Err(IdValidationError::LeadingTrailingWhitespace)
        );
        assert_eq!(
            IdentifierRules::REMOTE_ID.validate("   "),
            Err(IdValidationError::LeadingTrailingWhitespace)
        );
    }

    #[test]
    fn dot_only_ids_rejected() {
        assert!(IdentifierRules::REMOTE_ID.validate("..").is_err());
        assert!(IdentifierRules::REMOTE_ID.validate(".").is_err());
        assert!(IdentifierRules::REMOTE_ID.validate("v1.2").is_ok());
    }

    #[test]
    fn tool_names_reject_dots_and_spaces() {
        let rules = IdentifierRules::TOOL_NAME;
        assert!(rules.validate("evaluate_position").is_ok());
        assert_eq!(
            rules.validate("math.add"),
            Err(IdValidationError::InvalidCharacter { character: '.' })
        );
        assert_eq!(
            rules.validate("two words"),
            Err(IdValidationError::InvalidCharacter { character: ' ' })
        );
    }

    #[test]
    fn test_validate_too_long() {
        let name = "t".repeat(MAX_TOOL_NAME_LENGTH + 1);
        assert_eq!(
            IdentifierRules::TOOL_NAME.validate(&name),
            Err(IdValidationError::TooLong {
                length: MAX_TOOL_NAME_LENGTH + 1,
                max: MAX_TOOL_NAME_LENGTH
            })
        );
        assert!(
            IdentifierRules::TOOL_NAME
                .validate(&"t".repeat(MAX_TOOL_NAME_LENGTH))
                .is_ok()
        );
    }
}

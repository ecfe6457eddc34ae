//! Thread messages and selection of the final assistant reply.

use crate::identifiers::{MessageId, RunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message on a thread, reduced to its text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: MessageId,
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Unix timestamp in seconds
    pub created_at: i64,
    /// Concatenated text parts; empty when the message carries no text
    pub text: String,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// Text of the most recent assistant message.
///
/// Recency is the highest `created_at`; among equal timestamps the message
/// listed first wins, matching the newest-first order the remote returns.
pub fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<&str> {
    let mut latest: Option<&ThreadMessage> = None;
    for message in messages.iter().filter(|m| m.is_assistant()) {
        match latest {
            Some(current) if current.created_at >= message.created_at => {}
            _ => latest = Some(message),
        }
    }
    latest.map(|m| m.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, role: MessageRole, created_at: i64, text: &str) -> ThreadMessage {
        ThreadMessage {
            id: MessageId::new_unchecked(id),
            role,
            run_id: None,
            created_at,
            text: text.to_string(),
        }
    }

    #[test]
    fn picks_newest_assistant_message() {
        let messages = vec![
            message("msg_1", MessageRole::Assistant, 10, "old"),
            message("msg_2", MessageRole::User, 30, "question"),
            message("msg_3", MessageRole::Assistant, 20, "new"),
        ];
        assert_eq!(latest_assistant_text(&messages), Some("new"));
    }

    #[test]
    fn ties_go_to_list_position() {
        let messages = vec![
            message("msg_2", MessageRole::Assistant, 20, "first listed"),
            message("msg_1", MessageRole::Assistant, 20, "second listed"),
        ];
        assert_eq!(latest_assistant_text(&messages), Some("first listed"));
    }

    #[test]
    fn none_without_assistant_messages() {
        let messages = vec![message("msg_1", MessageRole::User, 1, "hi")];
        assert_eq!(latest_assistant_text(&messages), None);
        assert_eq!(latest_assistant_text(&[]), None);
    }
}

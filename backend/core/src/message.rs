use serde::{Deserialize, Serialize};

/// Who spoke a transcript line. The customer is `User`; the loan officer on
/// the other end of the call arrives through the voice API as `Assistant`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single stored transcript line.
///
/// Content is always trimmed and non-empty; the store rejects anything else
/// before a `TranscriptMessage` is ever constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds at insertion.
    pub timestamp: i64,
}

impl TranscriptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: crate::now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = TranscriptMessage::new(Role::User, "What's your best rate?");
        let json = serde_json::to_string(&msg).unwrap();
        let back: TranscriptMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "What's your best rate?");
        assert_eq!(back.timestamp, msg.timestamp);
    }
}

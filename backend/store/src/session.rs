use serde::{Deserialize, Serialize};

use dealcoach_core::{now_ms, LenderContext, Role, TranscriptMessage};

/// One customer-to-counterparty voice interaction, with its own bounded
/// transcript. Owned exclusively by the [`TranscriptStore`](crate::TranscriptStore);
/// nothing else mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub messages: Vec<TranscriptMessage>,
    pub start_time: i64,
    pub last_activity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub is_active: bool,
    /// Count of all messages ever added. Not reduced by window eviction.
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender: Option<LenderContext>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: id.into(),
            messages: Vec::new(),
            start_time: now,
            last_activity: now,
            end_time: None,
            is_active: true,
            message_count: 0,
            lender: None,
        }
    }

    pub fn stats(&self) -> SessionStats {
        let user_messages = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        let assistant_messages = self
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
        let end = self.end_time.unwrap_or_else(now_ms);
        SessionStats {
            session_id: self.id.clone(),
            total_messages: self.messages.len(),
            user_messages,
            assistant_messages,
            // Seconds, rounded, matching the persisted artifact format.
            duration: ((end - self.start_time) as f64 / 1000.0).round() as i64,
            is_active: self.is_active,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Per-session statistics, also embedded as `metadata` in the export artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    /// Session duration in seconds (end or now, minus start).
    pub duration: i64,
    pub is_active: bool,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

/// Store-wide aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub inactive_sessions: usize,
    pub total_messages: usize,
    pub max_messages_per_session: usize,
}

/// A message stripped down to role and content, the shape fed into prompt
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

impl From<&TranscriptMessage> for ContextMessage {
    fn from(msg: &TranscriptMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// The persisted artifact for one session: full window plus computed stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub session_id: String,
    pub messages: Vec<TranscriptMessage>,
    pub metadata: SessionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active_and_empty() {
        let s = Session::new("s1");
        assert!(s.is_active);
        assert!(s.messages.is_empty());
        assert_eq!(s.message_count, 0);
        let stats = s.stats();
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.user_messages, 0);
        assert!(stats.is_active);
    }

    #[test]
    fn test_stats_counts_by_role() {
        let mut s = Session::new("s1");
        s.messages.push(TranscriptMessage::new(Role::User, "hi"));
        s.messages
            .push(TranscriptMessage::new(Role::Assistant, "hello"));
        s.messages.push(TranscriptMessage::new(Role::User, "rates?"));
        let stats = s.stats();
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 1);
        assert_eq!(stats.total_messages, 3);
    }
}

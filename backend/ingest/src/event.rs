use serde::{Deserialize, Serialize};

/// One inbound event from the realtime voice API.
///
/// The upstream protocol is a wide tagged union keyed by `type`; only a
/// handful of fields matter for transcript purposes, so the payload is kept
/// duck-typed: every optional field is simply absent on events that don't
/// carry it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Final transcript text on "completed"/"done" transcription events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Incremental fragment on "delta" events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Final text on text-mode "done" events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ConversationItem>,
}

/// The `item` payload on conversation-item events.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationItem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// A typed content part inside a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RealtimeEvent {
    pub fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Whether this event suggests voice activity. Used as the heuristic for
    /// implicit session creation and for debug logging of unhandled events.
    pub fn is_voice_related(&self) -> bool {
        self.kind.contains("audio") || self.kind.contains("speech")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_done_event() {
        let ev: RealtimeEvent = serde_json::from_str(
            r#"{"type":"response.audio_transcript.done","transcript":"I can offer 5%."}"#,
        )
        .unwrap();
        assert_eq!(ev.kind, "response.audio_transcript.done");
        assert_eq!(ev.transcript.as_deref(), Some("I can offer 5%."));
        assert!(ev.is_voice_related());
    }

    #[test]
    fn test_deserialize_item_event() {
        let ev: RealtimeEvent = serde_json::from_str(
            r#"{"type":"conversation.item.create","item":{"type":"message","role":"user","content":[{"type":"input_text","text":"hello"}]}}"#,
        )
        .unwrap();
        let item = ev.item.unwrap();
        assert_eq!(item.content[0].kind, "input_text");
        assert_eq!(item.content[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_unknown_event_still_parses() {
        let ev: RealtimeEvent =
            serde_json::from_str(r#"{"type":"session.updated","session":{"voice":"verse"}}"#)
                .unwrap();
        assert_eq!(ev.kind, "session.updated");
        assert!(!ev.is_voice_related());
    }
}

//! Maps raw realtime-API events into transcript dispositions.
//!
//! Only the terminal transcription events ("completed"/"done") carry the
//! authoritative final text and produce a store write; deltas are fragments
//! of a message whose final text arrives later, and control events are
//! display-only.

use dealcoach_core::Role;

use crate::event::RealtimeEvent;

/// A durable transcript append derived from an event.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptWrite {
    pub role: Role,
    pub content: String,
}

/// What an inbound event means for the transcript and the live display.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// A finished line. `write` is set only for the two terminal
    /// transcription events.
    Complete {
        line: String,
        write: Option<TranscriptWrite>,
    },
    /// An incremental fragment of a still-in-progress response, to be
    /// concatenated into the running line.
    Delta(String),
    /// Speech start/stop control events: shown transiently, never stored.
    Status(String),
    /// Not relevant to the transcript.
    Ignored,
}

pub fn normalize(event: &RealtimeEvent) -> Disposition {
    match event.kind.as_str() {
        "conversation.item.create" => normalize_item(event),

        "response.audio_transcript.delta" => match &event.delta {
            Some(delta) => Disposition::Delta(delta.clone()),
            None => Disposition::Ignored,
        },

        // The durable assistant transcript text.
        "response.audio_transcript.done" => match &event.transcript {
            Some(transcript) => Disposition::Complete {
                line: format!("ASSISTANT (voice): {transcript}"),
                write: Some(TranscriptWrite {
                    role: Role::Assistant,
                    content: transcript.clone(),
                }),
            },
            None => Disposition::Ignored,
        },

        // Text-mode fallback pair, symmetric with the audio pair but with no
        // store write (the original service only persisted voice turns here).
        "response.text.delta" => match &event.delta {
            Some(delta) => Disposition::Delta(delta.clone()),
            None => Disposition::Ignored,
        },
        "response.text.done" => match &event.text {
            Some(text) => Disposition::Complete {
                line: format!("ASSISTANT: {text}"),
                write: None,
            },
            None => Disposition::Ignored,
        },

        // The durable user transcript text.
        "conversation.item.input_audio_transcription.completed" => match &event.transcript {
            Some(transcript) => Disposition::Complete {
                line: format!("USER (voice): \"{transcript}\""),
                write: Some(TranscriptWrite {
                    role: Role::User,
                    content: transcript.clone(),
                }),
            },
            None => Disposition::Ignored,
        },

        "input_audio_buffer.speech_started" => {
            Disposition::Status("USER: [Started speaking...]".to_string())
        }
        "input_audio_buffer.speech_stopped" => {
            Disposition::Status("USER: [Stopped speaking]".to_string())
        }

        _ => Disposition::Ignored,
    }
}

fn normalize_item(event: &RealtimeEvent) -> Disposition {
    let Some(item) = &event.item else {
        return Disposition::Ignored;
    };
    let Some(part) = item.content.first() else {
        return Disposition::Ignored;
    };

    // Assistant-authored items (text or audio), a fallback path some clients
    // use instead of response.* events.
    if item.kind.as_deref() == Some("message") && item.role.as_deref() == Some("assistant") {
        return match (part.kind.as_str(), &part.text) {
            ("text", Some(text)) => Disposition::Complete {
                line: format!("ASSISTANT: {text}"),
                write: None,
            },
            ("audio", _) => Disposition::Complete {
                line: "ASSISTANT (audio): [Audio response generated]".to_string(),
                write: None,
            },
            _ => Disposition::Ignored,
        };
    }

    match (part.kind.as_str(), &part.text) {
        ("input_text", Some(text)) => Disposition::Complete {
            line: format!("USER (typed): {text}"),
            write: None,
        },
        // No text payload exists yet; the transcription event follows later.
        ("input_audio", _) => Disposition::Complete {
            line: "USER (voice): [Audio input received]".to_string(),
            write: None,
        },
        _ => Disposition::Ignored,
    }
}

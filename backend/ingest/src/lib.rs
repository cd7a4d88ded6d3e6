pub mod event;
pub mod normalizer;

pub use event::{ContentPart, ConversationItem, RealtimeEvent};
pub use normalizer::{normalize, Disposition, TranscriptWrite};

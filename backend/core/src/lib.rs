pub mod analysis;
pub mod error;
pub mod event;
pub mod lender;
pub mod message;
pub mod traits;

pub use analysis::{AnalysisResult, NegotiationPotential};
pub use error::CoachError;
pub use event::CoachEvent;
pub use lender::{LenderContext, LenderTerms};
pub use message::{Role, TranscriptMessage};
pub use traits::{LlmProvider, LlmRequest, LlmResponse};

/// Current epoch time in milliseconds, the timestamp unit used across the
/// transcript store and broadcast payloads.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

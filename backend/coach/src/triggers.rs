//! Analysis trigger predicates and tuning constants.

use std::fmt;
use std::time::Duration;

/// Negotiation-relevant vocabulary. Any case-insensitive substring match in a
/// completed user message fires an analysis.
pub const TRIGGER_KEYWORDS: &[&str] = &[
    "rate",
    "interest rate",
    "apr",
    "fee",
    "application fee",
    "origination fee",
    "negotiate",
    "better deal",
    "discount",
    "refinance",
    "lower payment",
    "credit score",
    "qualification",
];

/// Trigger tuning. The defaults were arrived at by trial in the deployed
/// service; treat them as reasonable debounce values, nothing more.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Fire after this many messages since the last analysis.
    pub message_threshold: u32,
    /// Global cooldown between analyses, shared by all sessions.
    pub min_analysis_interval: Duration,
    /// Wait after an assistant completion before analyzing, so the final
    /// transcript settles.
    pub settle_delay: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            message_threshold: 10,
            min_analysis_interval: Duration::from_secs(30),
            settle_delay: Duration::from_millis(1500),
        }
    }
}

/// First keyword matched by a message, if any.
pub fn matched_keyword(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    TRIGGER_KEYWORDS
        .iter()
        .find(|keyword| lower.contains(**keyword))
        .copied()
}

/// Why an analysis ran; carried on the `analysis-update` broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerReason {
    Keyword(String),
    MessageThreshold(u32),
    ResponseCompleted,
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Keyword(keyword) => write!(f, "keyword detected: \"{keyword}\""),
            TriggerReason::MessageThreshold(count) => {
                write!(f, "message threshold reached ({count} messages)")
            }
            TriggerReason::ResponseCompleted => write!(f, "ai-response-completed"),
            TriggerReason::Manual => write!(f, "manual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        assert_eq!(
            matched_keyword("Can we REFINANCE this loan?"),
            Some("refinance")
        );
        assert_eq!(matched_keyword("What about the APR here?"), Some("apr"));
    }

    #[test]
    fn test_substring_match() {
        // "rate" matches inside larger words too; the vocabulary is a blunt
        // instrument on purpose.
        assert_eq!(matched_keyword("let's talk interest rates"), Some("rate"));
    }

    #[test]
    fn test_no_keyword_no_match() {
        assert_eq!(matched_keyword("nice weather today"), None);
        assert_eq!(matched_keyword(""), None);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            TriggerReason::Keyword("rate".into()).to_string(),
            "keyword detected: \"rate\""
        );
        assert_eq!(
            TriggerReason::MessageThreshold(10).to_string(),
            "message threshold reached (10 messages)"
        );
        assert_eq!(
            TriggerReason::ResponseCompleted.to_string(),
            "ai-response-completed"
        );
    }
}

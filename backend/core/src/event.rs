use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Events pushed to every connected UI listener over the broadcast channel.
///
/// `AnalysisStarted` is emitted optimistically as soon as a trigger fires;
/// the matching `AnalysisUpdate` or `AnalysisError` follows when the model
/// call resolves. Two overlapping analyses give no ordering guarantee
/// between their updates — `cached` and `timestamp` are how a listener
/// disambiguates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CoachEvent {
    AnalysisStarted {
        session_id: String,
    },
    AnalysisUpdate {
        session_id: String,
        analysis: AnalysisResult,
        /// Human-readable reason the analysis ran (keyword, threshold, ...).
        trigger: String,
        cached: bool,
        /// RFC 3339 wall-clock time the update was produced.
        timestamp: String,
    },
    AnalysisError {
        session_id: String,
        error: String,
    },
}

impl CoachEvent {
    pub fn session_id(&self) -> &str {
        match self {
            CoachEvent::AnalysisStarted { session_id }
            | CoachEvent::AnalysisUpdate { session_id, .. }
            | CoachEvent::AnalysisError { session_id, .. } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case_tags() {
        let ev = CoachEvent::AnalysisStarted {
            session_id: "s1".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "analysis-started");

        let ev = CoachEvent::AnalysisError {
            session_id: "s1".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "analysis-error");
    }

    #[test]
    fn test_session_id_accessor() {
        let ev = CoachEvent::AnalysisError {
            session_id: "s2".into(),
            error: "x".into(),
        };
        assert_eq!(ev.session_id(), "s2");
    }
}

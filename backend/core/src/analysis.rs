use serde::{Deserialize, Serialize};

/// How much negotiation room the model believes the customer currently has.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegotiationPotential {
    Low,
    Medium,
    High,
}

/// Structured coaching output parsed from the model response.
///
/// `main_recommendation` is the literal next utterance the customer should
/// say to the loan officer. All fields are optional because the model output
/// is parsed best-effort; a response missing fields is still usable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_potential: Option<NegotiationPotential>,
    #[serde(default)]
    pub main_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_tip: Option<String>,
}

impl AnalysisResult {
    /// Safe default returned when the model response contains no parseable
    /// JSON. Treated as a successful, low-confidence result.
    pub fn fallback() -> Self {
        Self {
            negotiation_potential: Some(NegotiationPotential::Medium),
            main_recommendation: Some(
                "Could you provide a detailed breakdown of all the fees and interest rates?"
                    .to_string(),
            ),
            quick_tip: Some(
                "Getting specific numbers helps you find negotiation opportunities".to_string(),
            ),
        }
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Offer terms for one lender, as entered on the comparison form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LenderTerms {
    pub interest_rate: Option<f64>,
    pub points: Option<f64>,
    pub total_closing_costs: Option<f64>,
    pub monthly_payment: Option<f64>,
}

/// Which counterparty the customer is currently on the phone with, plus the
/// known offers from every lender in play. Scoped per session: set via the
/// API and read by the analyzer when building prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LenderContext {
    pub current_lender: String,
    #[serde(default)]
    pub lender_data: HashMap<String, LenderTerms>,
}

impl LenderContext {
    /// Terms offered by the lender currently on the call.
    pub fn current_terms(&self) -> Option<&LenderTerms> {
        self.lender_data.get(&self.current_lender)
    }

    /// Competing offers, i.e. every lender other than the current one.
    pub fn competing(&self) -> impl Iterator<Item = (&String, &LenderTerms)> {
        self.lender_data
            .iter()
            .filter(move |(name, _)| **name != self.current_lender)
    }
}

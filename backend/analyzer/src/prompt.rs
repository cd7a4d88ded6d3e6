//! Coaching prompt construction.
//!
//! The transcript roles are relabeled CUSTOMER / LOAN OFFICER for the model,
//! and lender context (when set on the session) is stated explicitly so the
//! model can use the competing offer as leverage.

use dealcoach_core::{LenderContext, LenderTerms, Role};
use dealcoach_store::ContextMessage;

/// System framing: the model is a real-time coach producing the customer's
/// next literal line of dialogue.
pub const SYSTEM_PROMPT: &str = "You are a loan negotiation expert coaching a customer \
in real-time. Based on what the loan officer just said, tell the customer exactly what \
to say next.";

pub fn build_user_prompt(messages: &[ContextMessage], lender: Option<&LenderContext>) -> String {
    let conversation = messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "CUSTOMER",
                Role::Assistant => "LOAN OFFICER",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!("CONVERSATION:\n{conversation}\n");

    if let Some(ctx) = lender {
        prompt.push_str("\nKNOWN OFFERS:\n");
        if let Some(terms) = ctx.current_terms() {
            prompt.push_str(&format!(
                "CURRENT OFFER ({}): {}\n",
                ctx.current_lender,
                describe_terms(terms)
            ));
        }
        for (name, terms) in ctx.competing() {
            prompt.push_str(&format!(
                "COMPETING OFFER ({name}): {}\n",
                describe_terms(terms)
            ));
        }
    }

    prompt.push_str(
        r#"
Provide the customer's next response in this exact JSON format:
{
  "negotiationPotential": "Low|Medium|High",
  "mainRecommendation": "The exact words or question the customer should say next to the loan officer",
  "quickTip": "Brief coaching tip on tone or strategy (optional)"
}

Focus on the BEST response to leverage:
1. Interest rate negotiation opportunities
2. Fee reduction or waiver requests
3. Better terms or conditions
4. Competitive offers as leverage
5. Customer's strengths (credit score, relationship, etc.)

Make the mainRecommendation conversational, confident, and under 40 words. Write it as if the customer is speaking directly to the loan officer."#,
    );

    prompt
}

fn describe_terms(terms: &LenderTerms) -> String {
    let mut parts = Vec::new();
    if let Some(rate) = terms.interest_rate {
        parts.push(format!("{rate}% interest rate"));
    }
    if let Some(points) = terms.points {
        parts.push(format!("{points} points"));
    }
    if let Some(costs) = terms.total_closing_costs {
        parts.push(format!("${costs} closing costs"));
    }
    if let Some(payment) = terms.monthly_payment {
        parts.push(format!("${payment}/month"));
    }
    if parts.is_empty() {
        "terms not specified".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn messages() -> Vec<ContextMessage> {
        vec![
            ContextMessage {
                role: Role::User,
                content: "Can you do better on the rate?".into(),
            },
            ContextMessage {
                role: Role::Assistant,
                content: "That's our best offer.".into(),
            },
        ]
    }

    #[test]
    fn test_roles_relabeled() {
        let prompt = build_user_prompt(&messages(), None);
        assert!(prompt.contains("CUSTOMER: Can you do better on the rate?"));
        assert!(prompt.contains("LOAN OFFICER: That's our best offer."));
        assert!(!prompt.contains("assistant"));
    }

    #[test]
    fn test_lender_context_adds_offers() {
        let mut lender_data = HashMap::new();
        lender_data.insert(
            "lenderA".to_string(),
            LenderTerms {
                interest_rate: Some(6.625),
                points: Some(1.0),
                ..Default::default()
            },
        );
        lender_data.insert(
            "lenderB".to_string(),
            LenderTerms {
                interest_rate: Some(6.5),
                ..Default::default()
            },
        );
        let ctx = LenderContext {
            current_lender: "lenderA".into(),
            lender_data,
        };
        let prompt = build_user_prompt(&messages(), Some(&ctx));
        assert!(prompt.contains("CURRENT OFFER (lenderA): 6.625% interest rate, 1 points"));
        assert!(prompt.contains("COMPETING OFFER (lenderB): 6.5% interest rate"));
    }

    #[test]
    fn test_no_lender_section_without_context() {
        let prompt = build_user_prompt(&messages(), None);
        assert!(!prompt.contains("KNOWN OFFERS"));
    }
}

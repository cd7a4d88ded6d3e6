use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use dealcoach_core::{AnalysisResult, LlmProvider, LlmRequest};
use dealcoach_store::TranscriptStore;

use crate::cache::{AnalysisCache, CacheKey};
use crate::parse::parse_analysis;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};

/// Sampling and windowing parameters for the coaching call.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// How many recent messages are fed into the prompt.
    pub context_window: usize,
    pub cache_ttl: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1500,
            temperature: 0.3,
            context_window: 20,
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Result of one analysis attempt. Upstream failures are folded in here so a
/// timer-scheduled invocation can never crash its caller.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Ready {
        analysis: AnalysisResult,
        cached: bool,
    },
    Failed {
        error: String,
        details: Option<String>,
    },
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Ready { .. })
    }

    /// The `{success, analysis|error, cached}` body returned by the API.
    pub fn to_json(&self) -> Value {
        match self {
            AnalysisOutcome::Ready { analysis, cached } => json!({
                "success": true,
                "analysis": analysis,
                "cached": cached,
            }),
            AnalysisOutcome::Failed { error, details } => json!({
                "success": false,
                "error": error,
                "details": details,
            }),
        }
    }
}

/// Builds the coaching prompt from a session's recent transcript window,
/// calls the LLM, parses the structured response, and caches the result.
pub struct NegotiationAnalyzer {
    store: Arc<TranscriptStore>,
    provider: Arc<dyn LlmProvider>,
    cache: AnalysisCache,
    config: AnalyzerConfig,
}

impl NegotiationAnalyzer {
    pub fn new(
        store: Arc<TranscriptStore>,
        provider: Arc<dyn LlmProvider>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            cache: AnalysisCache::new(config.cache_ttl),
            config,
        }
    }

    /// Analyze a session's recent conversation for negotiation opportunities.
    /// Never panics and never returns `Err`; every failure mode degrades to
    /// [`AnalysisOutcome::Failed`].
    pub async fn analyze(&self, session_id: &str) -> AnalysisOutcome {
        let context = self
            .store
            .get_conversation_context(session_id, self.config.context_window)
            .await;

        if context.is_empty() {
            return AnalysisOutcome::Failed {
                error: "No conversation found".to_string(),
                details: None,
            };
        }

        let lender = self.store.lender_context(session_id).await;
        let key = CacheKey {
            session_id: session_id.to_string(),
            context_len: context.len(),
            lender: lender.as_ref().map(|l| l.current_lender.clone()),
        };

        if let Some(analysis) = self.cache.get(&key).await {
            info!(session_id, "Returning cached analysis");
            return AnalysisOutcome::Ready {
                analysis,
                cached: true,
            };
        }

        let request = LlmRequest {
            model: self.config.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(&context, lender.as_ref()),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id, provider = self.provider.name(), error = %e, "Analysis call failed");
                return AnalysisOutcome::Failed {
                    error: "Failed to analyze conversation".to_string(),
                    details: Some(e.to_string()),
                };
            }
        };

        info!(
            session_id,
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            "Analysis completed"
        );

        let analysis = parse_analysis(&response.content);
        self.cache.insert(key, analysis.clone()).await;

        AnalysisOutcome::Ready {
            analysis,
            cached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use dealcoach_core::{NegotiationPotential, Role};
    use dealcoach_store::StoreConfig;

    const MODEL_JSON: &str = r#"{"negotiationPotential":"High","mainRecommendation":"Can you match 6.5%?","quickTip":"Name the competitor."}"#;

    fn store() -> Arc<TranscriptStore> {
        Arc::new(TranscriptStore::new(StoreConfig {
            autosave: false,
            ..Default::default()
        }))
    }

    fn analyzer_with(
        store: Arc<TranscriptStore>,
        provider: Arc<MockProvider>,
        ttl: Duration,
    ) -> NegotiationAnalyzer {
        NegotiationAnalyzer::new(
            store,
            provider,
            AnalyzerConfig {
                cache_ttl: ttl,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_empty_session_fails_softly() {
        let analyzer = analyzer_with(
            store(),
            Arc::new(MockProvider::replying(MODEL_JSON)),
            Duration::from_secs(60),
        );
        match analyzer.analyze("missing").await {
            AnalysisOutcome::Failed { error, .. } => {
                assert_eq!(error, "No conversation found");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_on_identical_window() {
        let store = store();
        store.add_message("s1", Role::User, "rates?").await;
        let provider = Arc::new(MockProvider::replying(MODEL_JSON));
        let analyzer = analyzer_with(store.clone(), provider.clone(), Duration::from_secs(60));

        let first = analyzer.analyze("s1").await;
        let second = analyzer.analyze("s1").await;

        match (first, second) {
            (
                AnalysisOutcome::Ready {
                    cached: false,
                    analysis: a,
                },
                AnalysisOutcome::Ready {
                    cached: true,
                    analysis: b,
                },
            ) => {
                assert_eq!(a, b);
                assert_eq!(a.negotiation_potential, Some(NegotiationPotential::High));
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }
        assert_eq!(provider.call_count(), 1);

        // Growing the transcript changes the key and forces a fresh call.
        store.add_message("s1", Role::Assistant, "our rate is 7%").await;
        match analyzer.analyze("s1").await {
            AnalysisOutcome::Ready { cached, .. } => assert!(!cached),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let store = store();
        store.add_message("s1", Role::User, "rates?").await;
        let provider = Arc::new(MockProvider::replying(MODEL_JSON));
        let analyzer = analyzer_with(store.clone(), provider.clone(), Duration::from_millis(20));

        assert!(analyzer.analyze("s1").await.is_success());
        tokio::time::sleep(Duration::from_millis(40)).await;
        match analyzer.analyze("s1").await {
            AnalysisOutcome::Ready { cached, .. } => assert!(!cached),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_failed() {
        let store = store();
        store.add_message("s1", Role::User, "rates?").await;
        let analyzer = analyzer_with(
            store,
            Arc::new(MockProvider::failing()),
            Duration::from_secs(60),
        );
        match analyzer.analyze("s1").await {
            AnalysisOutcome::Failed { error, details } => {
                assert_eq!(error, "Failed to analyze conversation");
                assert!(details.unwrap().contains("mock provider failure"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_response_uses_fallback() {
        let store = store();
        store.add_message("s1", Role::User, "rates?").await;
        let analyzer = analyzer_with(
            store,
            Arc::new(MockProvider::replying("I cannot answer in JSON today.")),
            Duration::from_secs(60),
        );
        match analyzer.analyze("s1").await {
            AnalysisOutcome::Ready { analysis, cached } => {
                assert!(!cached);
                assert_eq!(analysis, AnalysisResult::fallback());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_outcome_json_shape() {
        let ready = AnalysisOutcome::Ready {
            analysis: AnalysisResult::fallback(),
            cached: true,
        };
        let body = ready.to_json();
        assert_eq!(body["success"], true);
        assert_eq!(body["cached"], true);
        assert!(body["analysis"]["mainRecommendation"].is_string());

        let failed = AnalysisOutcome::Failed {
            error: "No conversation found".into(),
            details: None,
        };
        let body = failed.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No conversation found");
    }
}

use anyhow::Result;
use async_trait::async_trait;

/// Completion backend used by the negotiation analyzer. Implementations wrap
/// a hosted model API (or a canned test double) behind one request/response
/// pair so the analyzer never sees transport details.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short identifier used in logs and registry lookups ("anthropic",
    /// "mock").
    fn name(&self) -> &str;

    /// Execute one completion round-trip.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// One coaching call: the prompt pair plus sampling limits.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Completion text plus the call metadata the analyzer logs.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use dealcoach_core::{LlmProvider, LlmRequest, LlmResponse};

/// Canned-response provider for tests and offline runs. Counts completion
/// calls so tests can assert how often the expensive path was taken.
pub struct MockProvider {
    response: String,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockProvider {
    pub fn replying(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let provider = Self::replying("");
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mock provider failure");
        }
        Ok(LlmResponse {
            content: self.response.clone(),
            provider: "mock".to_string(),
            model: request.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

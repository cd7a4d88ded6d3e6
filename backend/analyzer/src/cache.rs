use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use dealcoach_core::AnalysisResult;

/// Composite cache key: a new analysis is only worth paying for when the
/// transcript has grown or the lender on the call has changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub session_id: String,
    pub context_len: usize,
    /// Current-lender discriminator, when lender context is set.
    pub lender: Option<String>,
}

struct CachedEntry {
    result: AnalysisResult,
    stored_at: Instant,
}

/// TTL cache for analysis results. Entries expire independently of session
/// lifecycle.
pub struct AnalysisCache {
    entries: RwLock<HashMap<CacheKey, CachedEntry>>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<AnalysisResult> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.stored_at.elapsed() < self.ttl {
                    return Some(entry.result.clone());
                }
            } else {
                return None;
            }
        }
        // Expired: drop the stale entry.
        self.entries.write().await.remove(key);
        None
    }

    pub async fn insert(&self, key: CacheKey, result: AnalysisResult) {
        self.entries.write().await.insert(
            key,
            CachedEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }
}

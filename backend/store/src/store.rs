use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use dealcoach_core::{now_ms, LenderContext, Role, TranscriptMessage};

use crate::persist;
use crate::session::{ContextMessage, Session, SessionExport, SessionStats, StoreStats};

/// Tuning knobs for the transcript store. The defaults mirror the deployed
/// service; none of the specific values is load-bearing.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Sliding-window cap per session; oldest messages are evicted first.
    pub max_messages: usize,
    /// Sessions idle longer than this are removed by the cleanup sweep.
    pub session_timeout: Duration,
    /// Where ended sessions are persisted as JSON artifacts.
    pub conversations_dir: PathBuf,
    /// Persist sessions automatically on `end_session`.
    pub autosave: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            session_timeout: Duration::from_secs(30 * 60),
            conversations_dir: PathBuf::from("conversations"),
            autosave: true,
        }
    }
}

/// In-memory, per-session sliding-window transcript store.
///
/// All lookups on unknown session ids return `None`/`false`/empty, never an
/// error. Persistence failures are logged and reported as a failed count;
/// the in-memory session is untouched.
pub struct TranscriptStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    config: StoreConfig,
}

impl TranscriptStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create a session if absent; returns a snapshot of the (possibly
    /// pre-existing) session either way.
    pub async fn create_session(&self, session_id: &str) -> Session {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(session_id) {
            return existing.clone();
        }
        let session = Session::new(session_id);
        sessions.insert(session_id.to_string(), session.clone());
        info!(session_id, "Created conversation session");
        session
    }

    /// Append a message, creating the session on demand. Empty or
    /// whitespace-only content is rejected with no mutation.
    pub async fn add_message(&self, session_id: &str, role: Role, content: &str) -> bool {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return false;
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(session_id, "Created conversation session");
            Session::new(session_id)
        });

        session.messages.push(TranscriptMessage::new(role, trimmed));
        session.message_count += 1;
        session.last_activity = now_ms();

        if session.messages.len() > self.config.max_messages {
            let excess = session.messages.len() - self.config.max_messages;
            session.messages.drain(..excess);
        }

        debug!(
            session_id,
            role = %role,
            preview = %&trimmed[..trimmed.len().min(50)],
            "Added message"
        );
        true
    }

    pub async fn get_conversation(&self, session_id: &str) -> Option<Vec<TranscriptMessage>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| s.messages.clone())
    }

    /// Last `count` messages, or empty if the session is unknown.
    pub async fn get_recent_messages(
        &self,
        session_id: &str,
        count: usize,
    ) -> Vec<TranscriptMessage> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(s) => {
                let skip = s.messages.len().saturating_sub(count);
                s.messages[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Most recent `window_size` messages stripped to role/content, for
    /// prompt construction.
    pub async fn get_conversation_context(
        &self,
        session_id: &str,
        window_size: usize,
    ) -> Vec<ContextMessage> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(s) => {
                let skip = s.messages.len().saturating_sub(window_size);
                s.messages[skip..].iter().map(ContextMessage::from).collect()
            }
            None => Vec::new(),
        }
    }

    pub async fn get_session_stats(&self, session_id: &str) -> Option<SessionStats> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| s.stats())
    }

    /// Mark a session ended and, when autosave is on and the session has at
    /// least one message, persist it. Returns false for unknown sessions.
    pub async fn end_session(&self, session_id: &str) -> bool {
        let export = {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(session_id) else {
                return false;
            };
            session.is_active = false;
            session.end_time = Some(now_ms());
            info!(
                session_id,
                messages = session.message_count,
                "Ended conversation session"
            );
            if self.config.autosave && !session.messages.is_empty() {
                Some(SessionExport {
                    session_id: session.id.clone(),
                    messages: session.messages.clone(),
                    metadata: session.stats(),
                })
            } else {
                None
            }
        };

        if let Some(export) = export {
            if let Err(e) = persist::write_session(&self.config.conversations_dir, &export).await {
                error!(session_id, error = %e, "Failed to save ended session");
            }
        }
        true
    }

    /// Persist one session to disk. Returns false if the session is unknown
    /// or the write fails.
    pub async fn save_session_to_file(&self, session_id: &str) -> bool {
        let Some(export) = self.export_session(session_id).await else {
            warn!(session_id, "Cannot save session: not found");
            return false;
        };
        match persist::write_session(&self.config.conversations_dir, &export).await {
            Ok(_) => true,
            Err(e) => {
                error!(session_id, error = %e, "Failed to save session");
                false
            }
        }
    }

    /// Persist every session with at least one message. Used at shutdown.
    /// Returns the number saved; per-session failures are logged and skipped.
    pub async fn save_all_sessions(&self) -> usize {
        let ids: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|s| !s.messages.is_empty())
                .map(|s| s.id.clone())
                .collect()
        };

        let mut saved = 0;
        for id in ids {
            if self.save_session_to_file(&id).await {
                saved += 1;
            }
        }
        if saved > 0 {
            info!(saved, "Saved conversation sessions to files");
        }
        saved
    }

    /// Remove a session from memory entirely.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id, "Cleared conversation session");
        }
        removed
    }

    /// Drop sessions idle longer than the configured timeout. Intended to
    /// run on a periodic timer. Returns the number removed.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let cutoff = now_ms() - self.config.session_timeout.as_millis() as i64;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity >= cutoff);
        let cleaned = before - sessions.len();
        if cleaned > 0 {
            info!(cleaned, "Cleaned up expired conversation sessions");
        }
        cleaned
    }

    pub async fn get_active_sessions(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.is_active)
            .map(|s| s.id.clone())
            .collect()
    }

    pub async fn get_store_stats(&self) -> StoreStats {
        let sessions = self.sessions.read().await;
        let total_sessions = sessions.len();
        let active_sessions = sessions.values().filter(|s| s.is_active).count();
        let total_messages = sessions.values().map(|s| s.messages.len()).sum();
        StoreStats {
            total_sessions,
            active_sessions,
            inactive_sessions: total_sessions - active_sessions,
            total_messages,
            max_messages_per_session: self.config.max_messages,
        }
    }

    /// Full session dump (messages + computed stats), used by the export
    /// endpoint and file persistence.
    pub async fn export_session(&self, session_id: &str) -> Option<SessionExport> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| SessionExport {
            session_id: s.id.clone(),
            messages: s.messages.clone(),
            metadata: s.stats(),
        })
    }

    /// Attach lender context to a session, creating it on demand. The
    /// previous value is overwritten wholesale.
    pub async fn set_lender_context(&self, session_id: &str, context: LenderContext) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id));
        info!(session_id, lender = %context.current_lender, "Set lender context");
        session.lender = Some(context);
    }

    pub async fn lender_context(&self, session_id: &str) -> Option<LenderContext> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).and_then(|s| s.lender.clone())
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

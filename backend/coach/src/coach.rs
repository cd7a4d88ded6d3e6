use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dealcoach_analyzer::{AnalysisOutcome, NegotiationAnalyzer};
use dealcoach_core::{CoachEvent, Role};
use dealcoach_ingest::{normalize, Disposition, RealtimeEvent};
use dealcoach_store::TranscriptStore;

use crate::connection::ConnectionContext;
use crate::rate_gate::RateGate;
use crate::triggers::{matched_keyword, TriggerConfig, TriggerReason};

const BROADCAST_BUFFER: usize = 100;

/// Orchestrates the capture pipeline: normalizes inbound events, writes the
/// transcript, evaluates triggers, invokes analysis asynchronously, and fans
/// results out to every connected listener.
///
/// No failure from a downstream component escapes event handling; analysis
/// problems degrade to an `analysis-error` broadcast.
pub struct Coach {
    store: Arc<TranscriptStore>,
    analyzer: Arc<NegotiationAnalyzer>,
    broadcast_tx: broadcast::Sender<CoachEvent>,
    rate_gate: RateGate,
    config: TriggerConfig,
    /// Messages added since the last analysis, per session.
    counters: Mutex<HashMap<String, u32>>,
    /// Pending settle-delay tasks, keyed by session id. Replaced on
    /// re-schedule, aborted on session end.
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Coach {
    pub fn new(
        store: Arc<TranscriptStore>,
        analyzer: Arc<NegotiationAnalyzer>,
        config: TriggerConfig,
    ) -> Arc<Self> {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_BUFFER);
        Arc::new(Self {
            store,
            analyzer,
            broadcast_tx,
            rate_gate: RateGate::new(config.min_analysis_interval),
            config,
            counters: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &Arc<TranscriptStore> {
        &self.store
    }

    pub fn analyzer(&self) -> &Arc<NegotiationAnalyzer> {
        &self.analyzer
    }

    /// Subscribe to analysis broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Process one inbound realtime event for the given connection.
    pub async fn handle_event(self: &Arc<Self>, ctx: &mut ConnectionContext, event: &RealtimeEvent) {
        // First voice-related event on a connection starts its session.
        if ctx.current_session_id.is_none() && event.is_voice_related() {
            let session_id = format!("session-{}", Uuid::new_v4());
            self.store.create_session(&session_id).await;
            info!(connection = %ctx.id, session_id, "Started new conversation session");
            ctx.current_session_id = Some(session_id);
        }

        match normalize(event) {
            Disposition::Delta(fragment) => {
                ctx.push_delta(&fragment);
            }
            Disposition::Status(line) => {
                if let Some(partial) = ctx.flush_deltas() {
                    debug!(connection = %ctx.id, partial, "Flushed running line");
                }
                info!(connection = %ctx.id, "{line}");
            }
            Disposition::Complete { line, write } => {
                if let Some(partial) = ctx.flush_deltas() {
                    debug!(connection = %ctx.id, partial, "Flushed running line");
                }
                info!(connection = %ctx.id, "{line}");
                if let (Some(session_id), Some(write)) = (ctx.current_session_id.clone(), write) {
                    self.log_message(&session_id, write.role, &write.content).await;
                }
            }
            Disposition::Ignored => {
                if event.is_voice_related() {
                    debug!(
                        kind = %event.kind,
                        transcript = event.transcript.as_deref().unwrap_or(""),
                        delta = event.delta.as_deref().unwrap_or(""),
                        "Unhandled voice event"
                    );
                }
            }
        }
    }

    /// Append a durable transcript line and evaluate triggers. Returns false
    /// when the store rejects the content (empty or whitespace-only).
    pub async fn log_message(self: &Arc<Self>, session_id: &str, role: Role, content: &str) -> bool {
        if !self.store.add_message(session_id, role, content).await {
            return false;
        }

        let count = {
            let mut counters = self.counters.lock().await;
            let entry = counters.entry(session_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        match role {
            Role::User => {
                // Keyword takes priority; the count threshold only applies
                // when no keyword fired.
                if let Some(keyword) = matched_keyword(content) {
                    self.spawn_analysis(session_id.to_string(), TriggerReason::Keyword(keyword.into()));
                } else if count >= self.config.message_threshold {
                    self.spawn_analysis(
                        session_id.to_string(),
                        TriggerReason::MessageThreshold(count),
                    );
                }
            }
            Role::Assistant => {
                // The counterparty finished speaking: always coach the
                // customer's next line, after the transcript settles.
                self.schedule_post_response(session_id.to_string()).await;
            }
        }
        true
    }

    fn spawn_analysis(self: &Arc<Self>, session_id: String, reason: TriggerReason) {
        let coach = Arc::clone(self);
        tokio::spawn(async move {
            coach.analyze_and_broadcast(&session_id, reason).await;
        });
    }

    /// Schedule a delayed analysis for this session, replacing any task
    /// already pending for it.
    async fn schedule_post_response(self: &Arc<Self>, session_id: String) {
        let coach = Arc::clone(self);
        let task_session = session_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(coach.config.settle_delay).await;
            coach
                .analyze_and_broadcast(&task_session, TriggerReason::ResponseCompleted)
                .await;
            coach.pending.lock().await.remove(&task_session);
        });

        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.insert(session_id, handle) {
            old.abort();
        }
    }

    /// Run one gated analysis pass and broadcast the outcome.
    ///
    /// If the session has disappeared by the time a delayed task fires, the
    /// analyzer's "No conversation found" path handles it softly.
    pub async fn analyze_and_broadcast(&self, session_id: &str, reason: TriggerReason) {
        if !self.rate_gate.try_acquire() {
            info!(session_id, %reason, "Analysis skipped: too soon");
            return;
        }
        self.run_analysis(session_id, reason).await;
    }

    /// Run an analysis immediately, outside the cooldown entirely. Backs the
    /// manual API endpoints: the outcome still goes out over the broadcast
    /// channel, but the cooldown clock and per-session counters are left
    /// alone so automatic triggers keep their own cadence.
    pub async fn analyze_now(&self, session_id: &str) -> AnalysisOutcome {
        self.run_analysis(session_id, TriggerReason::Manual).await
    }

    async fn run_analysis(&self, session_id: &str, reason: TriggerReason) -> AnalysisOutcome {
        info!(session_id, %reason, "Triggering analysis");
        let _ = self.broadcast_tx.send(CoachEvent::AnalysisStarted {
            session_id: session_id.to_string(),
        });

        let outcome = self.analyzer.analyze(session_id).await;
        match &outcome {
            AnalysisOutcome::Ready { analysis, cached } => {
                let _ = self.broadcast_tx.send(CoachEvent::AnalysisUpdate {
                    session_id: session_id.to_string(),
                    analysis: analysis.clone(),
                    trigger: reason.to_string(),
                    cached: *cached,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                });
                info!(session_id, cached = *cached, "Analysis broadcast");
            }
            AnalysisOutcome::Failed { error, .. } => {
                let _ = self.broadcast_tx.send(CoachEvent::AnalysisError {
                    session_id: session_id.to_string(),
                    error: error.clone(),
                });
                warn!(session_id, error = %error, "Analysis failed");
            }
        }

        // Triggered runs stamp and reset regardless of success, so a failing
        // upstream doesn't get hammered. Manual runs leave both alone.
        if reason != TriggerReason::Manual {
            self.rate_gate.stamp();
            self.counters.lock().await.remove(session_id);
        }
        outcome
    }

    /// End a session: cancel its pending settle task, then mark it ended in
    /// the store (which persists it when autosave is on).
    pub async fn end_session(&self, session_id: &str) -> bool {
        if let Some(handle) = self.pending.lock().await.remove(session_id) {
            handle.abort();
        }
        self.counters.lock().await.remove(session_id);
        self.store.end_session(session_id).await
    }
}

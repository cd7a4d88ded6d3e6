use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use dealcoach_coach::{Coach, ConnectionContext};
use dealcoach_core::{CoachEvent, LenderContext, LenderTerms};
use dealcoach_ingest::RealtimeEvent;

/// Shared application state for API handlers.
pub struct AppState {
    pub coach: Arc<Coach>,
    /// Session context for the HTTP ingest path. One per server: HTTP
    /// clients that don't name a session all feed the same conversation.
    pub http_ctx: Mutex<ConnectionContext>,
    /// Most recent analysis-update body per session, kept current by a task
    /// subscribed to the coach's broadcasts.
    pub latest_analyses: RwLock<HashMap<String, Value>>,
}

impl AppState {
    pub fn new(coach: Arc<Coach>) -> Arc<Self> {
        Arc::new(Self {
            coach,
            http_ctx: Mutex::new(ConnectionContext::new()),
            latest_analyses: RwLock::new(HashMap::new()),
        })
    }

    /// Record every analysis-update broadcast so `/api/analysis/:id/latest`
    /// can serve it. Runs until the process exits.
    pub async fn track_latest_analyses(self: Arc<Self>) {
        let mut rx = self.coach.subscribe();
        loop {
            match rx.recv().await {
                Ok(event @ CoachEvent::AnalysisUpdate { .. }) => {
                    if let Ok(body) = serde_json::to_value(&event) {
                        self.latest_analyses
                            .write()
                            .await
                            .insert(event.session_id().to_string(), body);
                    }
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Latest-analysis tracker lagged behind broadcasts");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/log-conversation", post(log_conversation))
        .route("/api/conversation/current/end", post(end_current_session))
        .route("/api/conversation/:session_id", get(get_conversation))
        .route("/api/conversation/:session_id/context", get(get_context))
        .route("/api/conversation/:session_id/export", get(export_session))
        .route("/api/conversation/:session_id/end", post(end_session))
        .route("/api/conversations/active", get(active_sessions))
        .route("/api/conversations/stats", get(store_stats))
        .route("/api/analyze-conversation", post(analyze_conversation))
        .route("/api/analyze-current", post(analyze_current))
        .route("/api/analysis/:session_id/latest", get(latest_analysis))
        .route("/api/set-lender-context", post(set_lender_context))
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

/// WebSocket handler: realtime events in, coaching broadcasts out.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut ctx = ConnectionContext::new();
    info!(connection = %ctx.id, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut broadcasts = BroadcastStream::new(state.coach.subscribe());

    loop {
        tokio::select! {
            outbound = broadcasts.next() => {
                match outbound {
                    Some(Ok(event)) => {
                        let Ok(json) = serde_json::to_string(&event) else { continue };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(_)) => continue, // lagged; drop and keep going
                    None => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&state, &mut ctx, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection = %ctx.id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    // A dropped connection ends its conversation.
    if let Some(session_id) = ctx.clear_session() {
        state.coach.end_session(&session_id).await;
    }
    info!(connection = %ctx.id, "WebSocket client disconnected");
}

async fn handle_client_frame(state: &Arc<AppState>, ctx: &mut ConnectionContext, text: &str) {
    let frame: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!(connection = %ctx.id, error = %e, "Unparseable client frame");
            return;
        }
    };

    match frame.get("type").and_then(Value::as_str) {
        Some("realtime-event") => {
            match serde_json::from_value::<RealtimeEvent>(frame["event"].clone()) {
                Ok(event) => state.coach.handle_event(ctx, &event).await,
                Err(e) => debug!(connection = %ctx.id, error = %e, "Malformed realtime event"),
            }
        }
        Some("end-session") => {
            if let Some(session_id) = ctx.clear_session() {
                state.coach.end_session(&session_id).await;
            }
        }
        other => {
            debug!(connection = %ctx.id, kind = ?other, "Unknown client frame type");
        }
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dealcoach",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct LogConversationRequest {
    event: Option<RealtimeEvent>,
}

/// Ingest a realtime event over HTTP instead of the WebSocket. All HTTP
/// clients share one server-owned session context; the event runs through
/// the same normalize/trigger pipeline as WebSocket frames.
async fn log_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogConversationRequest>,
) -> Json<Value> {
    if let Some(event) = req.event {
        let mut ctx = state.http_ctx.lock().await;
        state.coach.handle_event(&mut ctx, &event).await;
    }
    Json(json!({ "success": true }))
}

/// Full transcript plus computed stats for one session.
async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let store = state.coach.store();
    let messages = store
        .get_conversation(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let stats = store.get_session_stats(&session_id).await;
    Ok(Json(json!({
        "sessionId": session_id,
        "messages": messages,
        "stats": stats,
    })))
}

#[derive(Deserialize)]
struct ContextQuery {
    size: Option<usize>,
}

/// Role/content pairs from the tail of the transcript, sized for prompts.
async fn get_context(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<ContextQuery>,
) -> Json<Value> {
    let context = state
        .coach
        .store()
        .get_conversation_context(&session_id, query.size.unwrap_or(20))
        .await;
    Json(json!({ "context": context }))
}

/// Complete session dump, the same shape persisted to disk, served as a
/// download.
async fn export_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.coach.store().export_session(&session_id).await {
        Some(export) => {
            let disposition = format!(
                "attachment; filename=\"conversation-{}.json\"",
                export.session_id
            );
            Ok((
                [(axum::http::header::CONTENT_DISPOSITION, disposition)],
                Json(json!(export)),
            ))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if state.coach.end_session(&session_id).await {
        Ok(Json(json!({ "status": "ended", "sessionId": session_id })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// End the server's current HTTP session, if one exists.
async fn end_current_session(State(state): State<Arc<AppState>>) -> Json<Value> {
    let ended = {
        let mut ctx = state.http_ctx.lock().await;
        ctx.clear_session()
    };
    match ended {
        Some(session_id) => {
            state.coach.end_session(&session_id).await;
            Json(json!({ "status": "ended", "sessionId": session_id }))
        }
        None => Json(json!({ "status": "no-active-session" })),
    }
}

async fn active_sessions(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sessions = state.coach.store().get_active_sessions().await;
    Json(json!({ "sessions": sessions }))
}

async fn store_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.coach.store().get_store_stats().await;
    Json(json!(stats))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    session_id: Option<String>,
}

/// Run an analysis on demand, bypassing trigger evaluation and the cooldown
/// but not the analyzer's cache. Without an explicit session id the current
/// HTTP session is analyzed. The outcome also goes out over the broadcast
/// channel.
async fn analyze_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Value>, StatusCode> {
    let session_id = match req.session_id {
        Some(id) => id,
        None => {
            let ctx = state.http_ctx.lock().await;
            ctx.current_session_id
                .clone()
                .ok_or(StatusCode::BAD_REQUEST)?
        }
    };
    let outcome = state.coach.analyze_now(&session_id).await;
    Ok(Json(outcome.to_json()))
}

/// Analyze the server's current HTTP session.
async fn analyze_current(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    let session_id = {
        let ctx = state.http_ctx.lock().await;
        ctx.current_session_id.clone()
    }
    .ok_or(StatusCode::NOT_FOUND)?;
    let outcome = state.coach.analyze_now(&session_id).await;
    Ok(Json(outcome.to_json()))
}

/// Most recent analysis-update produced for a session.
async fn latest_analysis(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let analyses = state.latest_analyses.read().await;
    match analyses.get(&session_id) {
        Some(body) => Ok(Json(body.clone())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetLenderContextRequest {
    session_id: Option<String>,
    lender: String,
    #[serde(default)]
    lender_data: HashMap<String, LenderTerms>,
}

/// Attach lender offer data to a session so the analyzer can compare terms.
/// Without an explicit session id the data goes to the current HTTP session.
async fn set_lender_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetLenderContextRequest>,
) -> Result<Json<Value>, StatusCode> {
    let session_id = match req.session_id {
        Some(id) => id,
        None => {
            let ctx = state.http_ctx.lock().await;
            ctx.current_session_id
                .clone()
                .ok_or(StatusCode::BAD_REQUEST)?
        }
    };
    let context = LenderContext {
        current_lender: req.lender.clone(),
        lender_data: req.lender_data,
    };
    state
        .coach
        .store()
        .set_lender_context(&session_id, context)
        .await;
    Ok(Json(json!({ "success": true, "lender": req.lender })))
}

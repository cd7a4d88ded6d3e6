use uuid::Uuid;

/// State owned by one client connection and threaded through the
/// event-handling call chain: which session this connection is feeding, and
/// the running line accumulated from delta fragments.
///
/// Each WebSocket connection holds its own context; the HTTP ingest path
/// shares a single server-owned one.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    pub id: String,
    pub current_session_id: Option<String>,
    delta_buffer: String,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            current_session_id: None,
            delta_buffer: String::new(),
        }
    }

    pub fn push_delta(&mut self, fragment: &str) {
        self.delta_buffer.push_str(fragment);
    }

    /// Take and clear the accumulated running line, if any.
    pub fn flush_deltas(&mut self) -> Option<String> {
        if self.delta_buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.delta_buffer))
        }
    }

    /// Drop the session pointer, returning the id it held.
    pub fn clear_session(&mut self) -> Option<String> {
        self.delta_buffer.clear();
        self.current_session_id.take()
    }
}

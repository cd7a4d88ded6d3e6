//! Session artifact persistence.
//!
//! Each ended session is serialized as a pretty-printed JSON file named
//! `conversation-{sessionId}.json` under the conversations directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::session::SessionExport;

/// Path of the artifact for a given session id.
pub fn artifact_path(dir: &Path, session_id: &str) -> PathBuf {
    dir.join(format!("conversation-{}.json", session_id))
}

/// Write one session export to disk, creating the directory on demand.
pub async fn write_session(dir: &Path, export: &SessionExport) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating conversations dir {}", dir.display()))?;

    let path = artifact_path(dir, &export.session_id);
    let json = serde_json::to_string_pretty(export).context("serializing session export")?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!(
        session_id = %export.session_id,
        path = %path.display(),
        messages = export.messages.len(),
        "Saved conversation to file"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealcoach_core::{Role, TranscriptMessage};

    #[tokio::test]
    async fn test_write_session_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut messages = vec![
            TranscriptMessage::new(Role::User, "What's the rate?"),
            TranscriptMessage::new(Role::Assistant, "6.5 percent."),
        ];
        messages[0].timestamp = 1;
        messages[1].timestamp = 2;

        let export = SessionExport {
            session_id: "s1".into(),
            messages,
            metadata: crate::session::Session::new("s1").stats(),
        };

        let path = write_session(dir.path(), &export).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let back: SessionExport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.session_id, "s1");
        assert_eq!(back.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let export = SessionExport {
            session_id: "s2".into(),
            messages: vec![],
            metadata: crate::session::Session::new("s2").stats(),
        };
        let path = write_session(&nested, &export).await.unwrap();
        assert!(path.exists());
    }
}

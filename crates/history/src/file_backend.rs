//! File-based history: append-only JSON-lines storage.
//!
//! Each line is one `{"conversation_id": ..., "message": {...}}` record.
//! The whole file is replayed into memory on creation; every append writes
//! exactly one new line, so a crash can lose at most the line being written.
//!
//! Storage location: `~/.voxloop/history.jsonl` unless configured otherwise.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use voxloop_core::error::HistoryError;
use voxloop_core::history::HistoryStore;
use voxloop_core::message::{ConversationId, Message};

#[derive(Serialize, Deserialize)]
struct Record {
    conversation_id: ConversationId,
    message: Message,
}

/// A JSONL-backed history store.
///
/// Reads are served from the in-memory copy. The mutex also serializes the
/// file writes so lines from concurrent appends never interleave.
pub struct FileHistory {
    path: PathBuf,
    conversations: Mutex<HashMap<ConversationId, Vec<Message>>>,
}

impl FileHistory {
    /// Open the store at `path`. A missing file starts empty and is created
    /// on first append.
    pub fn new(path: PathBuf) -> Self {
        let conversations = Self::load_from_disk(&path);
        debug!(
            path = %path.display(),
            conversations = conversations.len(),
            "File history backend loaded"
        );
        Self {
            path,
            conversations: Mutex::new(conversations),
        }
    }

    fn load_from_disk(path: &Path) -> HashMap<ConversationId, Vec<Message>> {
        let mut conversations: HashMap<ConversationId, Vec<Message>> = HashMap::new();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return conversations,
        };

        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(line) {
                Ok(record) => conversations
                    .entry(record.conversation_id)
                    .or_default()
                    .push(record.message),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping corrupted history record"),
            }
        }
        conversations
    }

    fn write_line(&self, line: &str) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HistoryError::Storage(format!("Failed to create history directory: {e}"))
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::Storage(format!("Failed to open history file: {e}")))?;
        writeln!(file, "{line}")
            .map_err(|e| HistoryError::Storage(format!("Failed to write history file: {e}")))
    }
}

#[async_trait]
impl HistoryStore for FileHistory {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, id: &ConversationId, message: Message) -> Result<(), HistoryError> {
        let record = Record {
            conversation_id: id.clone(),
            message,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| HistoryError::Storage(format!("Failed to serialize message: {e}")))?;

        let mut conversations = self.conversations.lock().await;
        self.write_line(&line)?;
        conversations
            .entry(record.conversation_id)
            .or_default()
            .push(record.message);
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, HistoryError> {
        Ok(self
            .conversations
            .lock()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxloop_core::message::MessageToolCall;

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        (dir, path)
    }

    #[tokio::test]
    async fn starts_empty_without_file() {
        let (_dir, path) = temp_path();
        let store = FileHistory::new(path.clone());
        assert!(store.get(&"c1".into()).await.unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let (_dir, path) = temp_path();
        let id = ConversationId::from("c1");
        let sent = vec![
            Message::user("what's new?"),
            Message::assistant_tool_calls(
                "",
                vec![MessageToolCall {
                    id: "call_9".into(),
                    name: "web_search".into(),
                    arguments: r#"{"query":"news"}"#.into(),
                }],
            ),
            Message::tool_result("call_9", "[]"),
            Message::assistant("Nothing much."),
        ];

        {
            let store = FileHistory::new(path.clone());
            for m in &sent {
                store.append(&id, m.clone()).await.unwrap();
            }
            store.append(&"other".into(), Message::user("x")).await.unwrap();
        }

        let reopened = FileHistory::new(path);
        assert_eq!(reopened.get(&id).await.unwrap(), sent);
        assert_eq!(reopened.get(&"other".into()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn appends_one_line_per_message() {
        let (_dir, path) = temp_path();
        let store = FileHistory::new(path.clone());
        store.append(&"c1".into(), Message::user("a")).await.unwrap();
        store.append(&"c1".into(), Message::assistant("b")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().all(|l| l.contains("\"conversation_id\":\"c1\"")));
    }

    #[tokio::test]
    async fn skips_corrupted_lines() {
        let (_dir, path) = temp_path();
        let good = serde_json::to_string(&Record {
            conversation_id: "c1".into(),
            message: Message::user("kept"),
        })
        .unwrap();
        std::fs::write(&path, format!("{{not json\n{good}\n\n")).unwrap();

        let store = FileHistory::new(path);
        let msgs = store.get(&"c1".into()).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].content, "kept");
    }
}

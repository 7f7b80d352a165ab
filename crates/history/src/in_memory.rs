//! In-memory history: a process-lifetime map of transcripts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use voxloop_core::error::HistoryError;
use voxloop_core::history::HistoryStore;
use voxloop_core::message::{ConversationId, Message};

/// Transcripts keyed by conversation id. Lost on restart.
#[derive(Default, Clone)]
pub struct InMemoryHistory {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<Message>>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations that have at least one message.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, id: &ConversationId, message: Message) -> Result<(), HistoryError> {
        self.conversations
            .write()
            .await
            .entry(id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, HistoryError> {
        Ok(self
            .conversations
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}

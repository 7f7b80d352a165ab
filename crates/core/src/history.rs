//! History store trait: the per-conversation append log.
//!
//! A conversation comes into existence on its first append and is only ever
//! extended. There is no compare-and-set: readers get the full transcript.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::message::{ConversationId, Message};

/// The core HistoryStore trait.
///
/// Implementations: in-memory, JSONL file, SQLite.
/// Every implementation must be safe under concurrent `append` calls.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "sqlite").
    fn name(&self) -> &str;

    /// Add one message to the end of the conversation, creating it if absent.
    async fn append(&self, id: &ConversationId, message: Message) -> Result<(), HistoryError>;

    /// The full transcript, oldest first. Unknown ids yield an empty list.
    async fn get(&self, id: &ConversationId) -> Result<Vec<Message>, HistoryError>;
}

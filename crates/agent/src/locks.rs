//! Per-conversation turn serialization.
//!
//! Two turns on the same conversation id never interleave their history
//! writes: the second waits until the first returns. Different ids proceed
//! independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use voxloop_core::message::ConversationId;

/// Held for the duration of one turn.
pub type TurnGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct TurnLocks {
    slots: Mutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `id`.
    pub async fn acquire(&self, id: &ConversationId) -> TurnGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            // Idle slots are referenced only by the map.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(id.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }
}

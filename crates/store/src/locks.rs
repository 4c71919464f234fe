//! Per-conversation critical sections.
//!
//! Two concurrent events for the SAME conversation id must not interleave
//! their read-model-write sequences; events for different ids run fully in
//! parallel. The handler acquires the conversation's lock for the duration
//! of one event.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use docpilot_core::message::ConversationId;

/// A map of async mutexes keyed by conversation id.
#[derive(Default)]
pub struct SessionLocks {
    locks: RwLock<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one conversation, creating it on first use.
    /// The guard is owned so it can be held across await points.
    pub async fn acquire(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        };
        lock.lock_owned().await
    }
}

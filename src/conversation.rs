//! Local chat id to remote MABOT `chat_id` mapping.

use std::sync::Arc;

use mabot_api::{KeyValueStore, StorageError};

pub const CONVERSATION_KEY_PREFIX: &str = "mabot_chat_id:";

#[derive(Clone)]
pub struct ConversationMap {
    store: Arc<dyn KeyValueStore>,
}

impl ConversationMap {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn remote_id(&self, local_chat_id: &str) -> Option<String> {
        self.store
            .get(&conversation_key(local_chat_id))
            .filter(|id| !id.trim().is_empty())
    }

    pub fn remember(&self, local_chat_id: &str, remote_chat_id: &str) -> Result<(), StorageError> {
        self.store
            .set(&conversation_key(local_chat_id), remote_chat_id)
    }

    pub fn forget(&self, local_chat_id: &str) -> Result<(), StorageError> {
        self.store.remove(&conversation_key(local_chat_id))
    }
}

impl std::fmt::Debug for ConversationMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMap").finish_non_exhaustive()
    }
}

pub fn conversation_key(local_chat_id: &str) -> String {
    format!("{CONVERSATION_KEY_PREFIX}{local_chat_id}")
}

//! Local chat history: one append-only JSONL file per chat.

mod error;
mod paths;
mod schema;
mod store;

pub use error::ChatStoreError;
pub use paths::{chat_file_name, chat_root, CHAT_DIR};
pub use schema::{Chat, ChatHeader, ChatLog, StoredMessage, VisibilityRecord, CHAT_FORMAT_VERSION};
pub use store::{ChatStore, DEFAULT_HISTORY_LIMIT};

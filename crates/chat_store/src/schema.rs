use serde::{Deserialize, Serialize};

pub const CHAT_FORMAT_VERSION: u32 = 1;

/// First line of every chat file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHeader {
    pub version: u32,
    pub id: String,
    pub public_id: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub created_at: String,
}

/// Sharing toggle; the last one in the file wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRecord {
    pub is_public: bool,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonLine {
    Chat(ChatHeader),
    Message(StoredMessage),
    Visibility(VisibilityRecord),
}

/// Chat summary as shown in the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: String,
    pub public_id: String,
    pub title: String,
    pub is_public: bool,
    pub created_at: String,
    /// Timestamp of the last record, or `created_at` for an empty chat.
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLog {
    pub chat: Chat,
    pub messages: Vec<StoredMessage>,
}

use std::path::{Path, PathBuf};

pub const CHAT_DIR: &str = "chats";

#[must_use]
pub fn chat_root(data_dir: &Path) -> PathBuf {
    data_dir.join(CHAT_DIR)
}

#[must_use]
pub fn chat_file_name(chat_id: &str) -> String {
    format!("{chat_id}.jsonl")
}

/// Chat ids become file names; only uuid-like ids are accepted.
#[must_use]
pub(crate) fn is_valid_chat_id(chat_id: &str) -> bool {
    !chat_id.is_empty()
        && chat_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

use std::path::PathBuf;

use chat_store::ChatStoreError;
use mabot_api::{MabotError, StorageError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] MabotError),

    #[error(transparent)]
    ChatStore(#[from] ChatStoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chat not found: {0}")]
    ChatNotFound(String),

    #[error("audio messages need the MABOT gateway; set MABOT_API_URL")]
    AudioUnsupported,
}

impl AssistError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

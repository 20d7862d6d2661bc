//! Authenticated client for the MABOT conversational gateway.
//!
//! The client owns the bearer-token lifecycle (password login, refresh,
//! logout) and one deployment quirk: some gateways only answer under
//! `<base>/api`, serving an HTML page at the bare base. The client probes
//! that suffix at most once per call and, once it works, stays on it.
//!
//! Tokens live in a caller-supplied [`KeyValueStore`], so the same client
//! works with an in-memory store in tests and a file-backed store in the
//! terminal shell.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod storage;
pub mod url;

pub use client::{MabotClient, WebMessage};
pub use config::MabotConfig;
pub use error::MabotError;
pub use payload::{Content, Message, ParseMode, Platform, Role, Token, UpdateIn, UpdateOut};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use url::{normalize_base_url, BaseMode};

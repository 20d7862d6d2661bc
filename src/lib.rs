//! SAP support assistant: chats persisted locally, replies from the MABOT
//! gateway (or canned replies when no gateway is configured), and a reply
//! normalizer that turns run-on gateway text into renderable Markdown.
//!
//! # Public API Overview
//! - Configure with [`AssistConfig::from_env`] and install logging with [`logging::init`].
//! - Drive conversations through [`ChatService`].
//! - Format assistant text with [`display_text`] or [`render_html`].

pub mod assistant;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod render;

pub use crate::assistant::{Assistant, GatewayAssistant, SimulatedAssistant};
pub use crate::chat::{chat_title, ChatService, Exchange, WELCOME_MESSAGE};
pub use crate::config::{AssistConfig, ConfigError, Credentials, GatewayConfig};
pub use crate::conversation::ConversationMap;
pub use crate::error::AssistError;
pub use crate::normalize::{display_text, normalize_reply, Rule, REPLY_RULES};
pub use crate::render::render_html;

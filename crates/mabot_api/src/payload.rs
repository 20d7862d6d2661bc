use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// Token pair returned by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
}

/// Refresh responses may omit either token; only a complete pair replaces the stored one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PartialToken {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    Markdown,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioContent {
    pub value: String,
    pub filename: String,
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_to_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_text: Option<String>,
}

/// Image, video and document payloads share one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub value: String,
    pub filename: String,
    pub mimetype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text(TextContent),
    Audio(AudioContent),
    Image(FileContent),
    Video(FileContent),
    Document(FileContent),
}

impl Content {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(TextContent {
            value: value.into(),
            parse_mode: None,
        })
    }

    /// Audio recording shipped inline as base64, asking the gateway to transcribe it.
    pub fn audio(
        bytes: &[u8],
        filename: impl Into<String>,
        mimetype: impl Into<String>,
    ) -> Self {
        Self::Audio(AudioContent {
            value: general_purpose::STANDARD.encode(bytes),
            filename: filename.into(),
            mimetype: mimetype.into(),
            parse_to_text: Some(true),
            parsed_text: None,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(content) => Some(content.value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Developer,
    System,
    User,
    Assistant,
    Tool,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    pub fn user(contents: Vec<Content>) -> Self {
        Self {
            role: Role::User,
            contents,
            reply_to_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Web,
    Whatsapp,
    Telegram,
}

/// Outbound envelope posted to `/io/input`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIn {
    pub platform: Platform,
    pub chat_id: Option<String>,
    pub platform_chat_id: Option<String>,
    pub messages: Vec<Message>,
    pub bot_username: Option<String>,
    #[serde(default)]
    pub prefix_with_bot_name: bool,
}

/// Inbound envelope; `chat_id` is the gateway-assigned conversation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOut {
    pub chat_id: String,
    #[serde(default)]
    pub platform_chat_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl UpdateOut {
    /// Text contents of every assistant message, joined by blank lines.
    pub fn assistant_text(&self) -> String {
        self.messages
            .iter()
            .filter(|message| message.role == Role::Assistant)
            .flat_map(|message| message.contents.iter())
            .filter_map(Content::as_text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

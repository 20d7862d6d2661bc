use std::path::Path;

use chat_store::{Chat, ChatLog, ChatStore, StoredMessage, DEFAULT_HISTORY_LIMIT};
use tracing::{info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::assistant::{Assistant, SimulatedAssistant};
use crate::config::AssistConfig;
use crate::error::AssistError;

pub const TITLE_MAX_GRAPHEMES: usize = 50;

pub const WELCOME_MESSAGE: &str = "¡Hola! Soy tu asistente de SAP impulsado por IA. Puedo \
ayudarte con consultas sobre módulos SAP, transacciones, configuraciones y mejores prácticas. \
¿En qué puedo asistirte hoy?";

/// One user turn and the reply it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub chat: Chat,
    pub user: StoredMessage,
    pub reply: StoredMessage,
}

#[derive(Debug)]
pub struct ChatService {
    store: ChatStore,
    assistant: Assistant,
    share_origin: String,
}

impl ChatService {
    pub fn new(store: ChatStore, assistant: Assistant, share_origin: impl Into<String>) -> Self {
        Self {
            store,
            assistant,
            share_origin: share_origin.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn from_config(config: &AssistConfig) -> Result<Self, AssistError> {
        Ok(Self::new(
            ChatStore::open(&config.data_dir)?,
            Assistant::from_config(config)?,
            config.share_origin.clone(),
        ))
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn welcome_message(&self) -> &'static str {
        WELCOME_MESSAGE
    }

    /// Sends `text` in `current_chat`, creating a chat first when none is open.
    ///
    /// Gateway failures never end the conversation: the error is logged and a
    /// simulated reply is stored instead.
    pub async fn send_message(
        &self,
        current_chat: Option<&str>,
        text: &str,
    ) -> Result<Exchange, AssistError> {
        let chat_id = self.resolve_chat(current_chat, text)?;
        let user = self.store.append_message(&chat_id, text, true)?;

        let reply_text = match self.assistant.reply(&chat_id, text).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(chat_id = %chat_id, %error, "assistant failed; using simulated reply");
                SimulatedAssistant.reply(text)
            }
        };

        self.finish_exchange(&chat_id, user, &reply_text)
    }

    /// Sends a recorded audio file; only the gateway can answer these.
    pub async fn send_audio(
        &self,
        current_chat: Option<&str>,
        path: &Path,
    ) -> Result<Exchange, AssistError> {
        if !self.assistant.is_gateway() {
            return Err(AssistError::AudioUnsupported);
        }
        let bytes = std::fs::read(path)
            .map_err(|source| AssistError::io("reading audio file", path, source))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_owned());
        let label = format!("[audio] {filename}");

        let chat_id = self.resolve_chat(current_chat, &label)?;
        let user = self.store.append_message(&chat_id, &label, true)?;

        let reply_text = match self
            .assistant
            .reply_to_audio(&chat_id, &bytes, &filename, audio_mimetype(path))
            .await
        {
            Ok(reply) => reply,
            Err(error) => {
                warn!(chat_id = %chat_id, %error, "assistant failed on audio; using simulated reply");
                SimulatedAssistant.reply(&label)
            }
        };

        self.finish_exchange(&chat_id, user, &reply_text)
    }

    /// Looks a chat up by id or public id.
    pub fn open(&self, id_or_public_id: &str) -> Result<ChatLog, AssistError> {
        self.store
            .find(id_or_public_id)?
            .ok_or_else(|| AssistError::ChatNotFound(id_or_public_id.to_owned()))
    }

    pub fn history(&self) -> Result<Vec<Chat>, AssistError> {
        Ok(self.store.list_recent(DEFAULT_HISTORY_LIMIT)?)
    }

    pub fn delete(&self, chat_id: &str) -> Result<(), AssistError> {
        self.store.delete(chat_id)?;
        self.assistant.forget_chat(chat_id);
        info!(chat_id, "deleted chat");
        Ok(())
    }

    /// Marks the chat public and returns its share link.
    pub fn share(&self, chat_id: &str) -> Result<String, AssistError> {
        let chat = self.store.set_public(chat_id, true)?;
        Ok(self.share_url(&chat))
    }

    pub fn share_url(&self, chat: &Chat) -> String {
        format!("{}/chat/{}", self.share_origin, chat.public_id)
    }

    fn resolve_chat(&self, current_chat: Option<&str>, text: &str) -> Result<String, AssistError> {
        match current_chat {
            Some(chat_id) => Ok(chat_id.to_owned()),
            None => {
                let chat = self.store.create_chat(&chat_title(text))?;
                info!(chat_id = %chat.id, "started chat");
                Ok(chat.id)
            }
        }
    }

    fn finish_exchange(
        &self,
        chat_id: &str,
        user: StoredMessage,
        reply_text: &str,
    ) -> Result<Exchange, AssistError> {
        let reply = self.store.append_message(chat_id, reply_text, false)?;
        let chat = self.store.load(chat_id)?.chat;
        Ok(Exchange { chat, user, reply })
    }
}

/// First 50 grapheme clusters of the first message, with `...` when cut.
pub fn chat_title(text: &str) -> String {
    let mut graphemes = text.graphemes(true);
    let head = graphemes
        .by_ref()
        .take(TITLE_MAX_GRAPHEMES)
        .collect::<String>();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn audio_mimetype(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("m4a" | "mp4") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_are_kept_whole() {
        assert_eq!(chat_title("¿Cómo creo un pedido?"), "¿Cómo creo un pedido?");
        assert_eq!(chat_title(&"a".repeat(50)), "a".repeat(50));
    }

    #[test]
    fn long_titles_are_cut_at_grapheme_boundaries() {
        let text = "é".repeat(60);
        assert_eq!(chat_title(&text), format!("{}...", "é".repeat(50)));

        let flags = "🇪🇸".repeat(51);
        assert_eq!(chat_title(&flags), format!("{}...", "🇪🇸".repeat(50)));
    }

    #[test]
    fn audio_mimetype_follows_extension() {
        assert_eq!(audio_mimetype(Path::new("nota.OGG")), "audio/ogg");
        assert_eq!(audio_mimetype(Path::new("nota.mp3")), "audio/mpeg");
        assert_eq!(audio_mimetype(Path::new("nota")), "application/octet-stream");
    }
}

//! Reply sources: the MABOT gateway, or canned replies when no gateway is configured.

use std::sync::Arc;

use mabot_api::{FileStore, KeyValueStore, MabotClient, MabotConfig, WebMessage};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{AssistConfig, ConfigError, Credentials, GatewayConfig};
use crate::conversation::ConversationMap;
use crate::error::AssistError;

const USER_AGENT: &str = concat!("sap-assist/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub enum Assistant {
    Gateway(GatewayAssistant),
    Simulated(SimulatedAssistant),
}

impl Assistant {
    /// Gateway when `MABOT_API_URL` is configured, otherwise simulated.
    ///
    /// Tokens and conversation mappings live in JSON files under the data
    /// directory.
    pub fn from_config(config: &AssistConfig) -> Result<Self, AssistError> {
        let Some(gateway) = &config.gateway else {
            info!("MABOT_API_URL not set; using simulated replies");
            return Ok(Self::Simulated(SimulatedAssistant));
        };
        let credentials = Arc::new(FileStore::open(config.credentials_path())?);
        let conversations = Arc::new(FileStore::open(config.conversations_path())?);
        Ok(Self::Gateway(GatewayAssistant::new(
            gateway,
            credentials,
            conversations,
        )?))
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }

    pub async fn reply(&self, local_chat_id: &str, text: &str) -> Result<String, AssistError> {
        match self {
            Self::Gateway(gateway) => gateway.reply(local_chat_id, text).await,
            Self::Simulated(simulated) => Ok(simulated.reply(text)),
        }
    }

    pub async fn reply_to_audio(
        &self,
        local_chat_id: &str,
        bytes: &[u8],
        filename: &str,
        mimetype: &str,
    ) -> Result<String, AssistError> {
        match self {
            Self::Gateway(gateway) => {
                gateway
                    .reply_to_audio(local_chat_id, bytes, filename, mimetype)
                    .await
            }
            Self::Simulated(_) => Err(AssistError::AudioUnsupported),
        }
    }

    /// Drops whatever remote state is tied to a deleted local chat.
    pub fn forget_chat(&self, local_chat_id: &str) {
        if let Self::Gateway(gateway) = self {
            gateway.forget_conversation(local_chat_id);
        }
    }
}

#[derive(Debug)]
pub struct GatewayAssistant {
    client: MabotClient,
    credentials: Option<Credentials>,
    bot_username: Option<String>,
    conversations: ConversationMap,
}

impl GatewayAssistant {
    pub fn new(
        config: &GatewayConfig,
        token_store: Arc<dyn KeyValueStore>,
        conversation_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AssistError> {
        let mut mabot = MabotConfig::new(config.base_url.clone()).with_user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            mabot = mabot.with_timeout(timeout);
        }

        Ok(Self {
            client: MabotClient::new(mabot, token_store)?,
            credentials: config.credentials.clone(),
            bot_username: config.bot_username.clone(),
            conversations: ConversationMap::new(conversation_store),
        })
    }

    pub fn client(&self) -> &MabotClient {
        &self.client
    }

    pub async fn reply(&self, local_chat_id: &str, text: &str) -> Result<String, AssistError> {
        self.exchange(local_chat_id, WebMessage::text(text)).await
    }

    pub async fn reply_to_audio(
        &self,
        local_chat_id: &str,
        bytes: &[u8],
        filename: &str,
        mimetype: &str,
    ) -> Result<String, AssistError> {
        self.exchange(local_chat_id, WebMessage::audio(bytes, filename, mimetype))
            .await
    }

    pub fn forget_conversation(&self, local_chat_id: &str) {
        if let Err(error) = self.conversations.forget(local_chat_id) {
            warn!(local_chat_id, %error, "failed to clear MABOT conversation id");
        } else {
            debug!(local_chat_id, "unlinked MABOT conversation");
        }
    }

    /// Logs in with the configured credentials unless tokens are already stored.
    pub async fn ensure_login(&self) -> Result<(), AssistError> {
        if self.client.is_authenticated() {
            return Ok(());
        }
        let Some(credentials) = &self.credentials else {
            return Err(ConfigError::MissingCredentials.into());
        };
        debug!(username = %credentials.username, "no stored tokens; logging in");
        self.client
            .login(&credentials.username, &credentials.password)
            .await?;
        Ok(())
    }

    async fn exchange(
        &self,
        local_chat_id: &str,
        message: WebMessage,
    ) -> Result<String, AssistError> {
        self.ensure_login().await?;

        let remote_chat_id = self.conversations.remote_id(local_chat_id);
        let message = message
            .with_chat_id(remote_chat_id.clone())
            .with_platform_chat_id(Some(local_chat_id.to_owned()))
            .with_bot_username(self.bot_username.clone());
        let reply = self.client.send_web_message(message).await?;

        if remote_chat_id.is_none() && !reply.chat_id.trim().is_empty() {
            if let Err(error) = self.conversations.remember(local_chat_id, &reply.chat_id) {
                warn!(local_chat_id, %error, "failed to persist MABOT conversation id");
            } else {
                debug!(local_chat_id, remote_chat_id = %reply.chat_id, "linked MABOT conversation");
            }
        }

        Ok(reply.assistant_text())
    }
}

/// Canned SAP-support replies that echo the question back.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAssistant;

impl SimulatedAssistant {
    pub const REPLY_COUNT: usize = 3;

    pub fn reply(&self, text: &str) -> String {
        let index = rand::thread_rng().gen_range(0..Self::REPLY_COUNT);
        self.reply_with(index, text)
    }

    /// `index` is taken modulo [`Self::REPLY_COUNT`].
    pub fn reply_with(&self, index: usize, text: &str) -> String {
        match index % Self::REPLY_COUNT {
            0 => format!(
                "Para consultas sobre {}, te recomiendo revisar las transacciones SE80 para \
                 desarrollo y SM30 para configuración de tablas. ¿Necesitas información más \
                 específica sobre algún módulo en particular?",
                text.to_lowercase()
            ),
            1 => format!(
                "En SAP, para resolver tu consulta sobre \"{text}\", deberías comenzar por \
                 verificar las autorizaciones en SU53 y luego revisar la configuración en SPRO. \
                 ¿Te gustaría que profundice en algún aspecto específico?"
            ),
            _ => format!(
                "Basándome en tu pregunta sobre \"{text}\", en SAP esto se maneja típicamente a \
                 través del módulo correspondiente. Te sugiero revisar la documentación en SE61 \
                 o consultar las notas SAP relevantes. ¿Qué módulo específico estás utilizando?"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_replies_embed_the_question() {
        let assistant = SimulatedAssistant;
        assert!(assistant
            .reply_with(0, "Pedidos MM")
            .starts_with("Para consultas sobre pedidos mm, te recomiendo"));
        assert!(assistant
            .reply_with(1, "Pedidos MM")
            .contains("tu consulta sobre \"Pedidos MM\""));
        assert!(assistant.reply_with(2, "Pedidos MM").contains("SE61"));
        assert_eq!(
            assistant.reply_with(3, "x"),
            assistant.reply_with(0, "x")
        );
    }

    #[test]
    fn random_reply_is_one_of_the_canned_ones() {
        let assistant = SimulatedAssistant;
        let reply = assistant.reply("FI");
        assert!((0..SimulatedAssistant::REPLY_COUNT).any(|i| assistant.reply_with(i, "FI") == reply));
    }

    #[tokio::test]
    async fn simulated_assistant_rejects_audio() {
        let assistant = Assistant::Simulated(SimulatedAssistant);
        let error = assistant
            .reply_to_audio("chat", b"OggS", "nota.ogg", "audio/ogg")
            .await
            .expect_err("audio needs the gateway");
        assert!(matches!(error, AssistError::AudioUnsupported));
    }

    #[tokio::test]
    async fn gateway_without_credentials_or_tokens_is_a_config_error() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            credentials: None,
            bot_username: None,
            timeout: None,
        };
        let gateway = GatewayAssistant::new(
            &config,
            Arc::new(mabot_api::MemoryStore::new()),
            Arc::new(mabot_api::MemoryStore::new()),
        )
        .expect("gateway assistant");

        let error = gateway
            .reply("chat", "hola")
            .await
            .expect_err("login is impossible");
        assert!(matches!(
            error,
            AssistError::Config(ConfigError::MissingCredentials)
        ));
    }
}

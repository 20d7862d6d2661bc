//! Environment configuration, read and validated once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_API_URL: &str = "MABOT_API_URL";
pub const ENV_USERNAME: &str = "MABOT_USERNAME";
pub const ENV_PASSWORD: &str = "MABOT_PASSWORD";
pub const ENV_BOT_USERNAME: &str = "MABOT_BOT_USERNAME";
pub const ENV_DATA_DIR: &str = "SAP_ASSIST_DATA_DIR";
pub const ENV_SHARE_ORIGIN: &str = "SAP_ASSIST_SHARE_ORIGIN";
pub const ENV_TIMEOUT_SECS: &str = "SAP_ASSIST_TIMEOUT_SECS";

pub const DEFAULT_DATA_DIR: &str = ".sap-assist";
pub const DEFAULT_SHARE_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{present} is set but {missing} is not; auto-login needs both")]
    IncompleteCredentials {
        present: &'static str,
        missing: &'static str,
    },

    #[error("SAP_ASSIST_TIMEOUT_SECS must be a positive integer, got {value:?}")]
    InvalidTimeout { value: String },

    #[error("gateway login requires MABOT_USERNAME and MABOT_PASSWORD")]
    MissingCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Gateway settings; present only when `MABOT_API_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    pub bot_username: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistConfig {
    /// `None` means replies come from the simulated assistant.
    pub gateway: Option<GatewayConfig>,
    pub data_dir: PathBuf,
    pub share_origin: String,
}

impl AssistConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = match (env_string_opt(ENV_USERNAME), env_string_opt(ENV_PASSWORD)) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials {
                    present: ENV_USERNAME,
                    missing: ENV_PASSWORD,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials {
                    present: ENV_PASSWORD,
                    missing: ENV_USERNAME,
                })
            }
        };

        let timeout = env_string_opt(ENV_TIMEOUT_SECS)
            .map(|value| parse_timeout(&value))
            .transpose()?;

        let gateway = env_string_opt(ENV_API_URL).map(|base_url| GatewayConfig {
            base_url,
            credentials,
            bot_username: env_string_opt(ENV_BOT_USERNAME),
            timeout,
        });

        Ok(Self {
            gateway,
            data_dir: env_string_opt(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            share_origin: env_string_opt(ENV_SHARE_ORIGIN)
                .map(|origin| origin.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_SHARE_ORIGIN.to_owned()),
        })
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    pub fn conversations_path(&self) -> PathBuf {
        self.data_dir.join("conversations.json")
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            value: value.to_owned(),
        }),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value.trim().to_owned())
        }
    })
}

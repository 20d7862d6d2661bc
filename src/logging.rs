//! `tracing` subscriber setup for the shell.
//!
//! - `SAP_ASSIST_LOG` or `RUST_LOG`: filter directives (e.g. `mabot_api=debug,warn`)
//! - `SAP_ASSIST_LOG_FORMAT`: `pretty`, `compact` or `json`
//!
//! Logs go to stderr; stdout belongs to the conversation.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG: &str = "SAP_ASSIST_LOG";
pub const ENV_LOG_FORMAT: &str = "SAP_ASSIST_LOG_FORMAT";
pub const DEFAULT_FILTER: &str = "sap_assist=info,mabot_api=info,warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Case-insensitive; anything unrecognised is `Pretty`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            format: LogFormat::Pretty,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());
        let format = std::env::var(ENV_LOG_FORMAT)
            .map(|value| LogFormat::parse(&value))
            .unwrap_or_default();

        Self {
            filter,
            format,
            ..Self::default()
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(config.with_target),
            )
            .try_init(),
    };
}

pub fn init_from_env() {
    init(&LogConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{env_lock, set_env_guard};

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("loud"), LogFormat::Pretty);
    }

    #[test]
    fn filter_prefers_app_variable_over_rust_log() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ENV_LOG, Some("mabot_api=debug"));
        let _g2 = set_env_guard("RUST_LOG", Some("trace"));
        let _g3 = set_env_guard(ENV_LOG_FORMAT, Some("json"));

        let config = LogConfig::from_env();
        assert_eq!(config.filter, "mabot_api=debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn filter_defaults_when_unset() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ENV_LOG, None);
        let _g2 = set_env_guard("RUST_LOG", None);
        let _g3 = set_env_guard(ENV_LOG_FORMAT, None);

        assert_eq!(LogConfig::from_env(), LogConfig::default());
    }
}

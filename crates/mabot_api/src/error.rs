use reqwest::StatusCode;
use thiserror::Error;

/// Longest slice of a response body quoted inside an error.
pub const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum MabotError {
    /// Login or refresh was rejected, or returned unusable data.
    #[error("MABOT auth failed{}: {message}", status_suffix(.status))]
    Auth {
        status: Option<StatusCode>,
        message: String,
    },

    /// Non-2xx response after the single fallback attempt.
    #[error("MABOT request failed: HTTP {status} {body}")]
    Request { status: StatusCode, body: String },

    /// Response body was not JSON after the single fallback attempt.
    #[error("MABOT non-JSON response: HTTP {status} {message}")]
    Format { status: StatusCode, message: String },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MabotError {
    pub fn auth(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    pub fn request(status: StatusCode, body: &str) -> Self {
        Self::Request {
            status,
            body: excerpt(body),
        }
    }

    pub fn format(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Format {
            status,
            message: message.into(),
        }
    }

    /// HTTP status attached to the error, when there is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Auth { status, .. } => *status,
            Self::Request { status, .. } | Self::Format { status, .. } => Some(*status),
            Self::Transport(error) => error.status(),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// First [`BODY_EXCERPT_CHARS`] characters of a response body.
pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    status
        .map(|status| format!(" (HTTP {})", status.as_u16()))
        .unwrap_or_default()
}

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::MabotConfig;
use crate::error::{excerpt, MabotError};
use crate::headers::{build_headers, is_json_content_type, to_header_map, MIME_FORM, MIME_JSON};
use crate::payload::{Content, Message, PartialToken, Platform, Token, UpdateIn, UpdateOut};
use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::url::{BaseMode, BasePath, INPUT_PATH, LOGIN_PATH, REFRESH_PATH};

/// Client for the MABOT gateway.
///
/// Every call issues a bounded number of requests: at most one
/// refresh-and-retry after a 401, then at most one probe of the `/api`
/// fallback base for a non-2xx status and one for a non-JSON body.
pub struct MabotClient {
    http: Client,
    config: MabotConfig,
    base: Mutex<BasePath>,
    store: Arc<dyn KeyValueStore>,
    refresh_gate: tokio::sync::Mutex<()>,
}

/// One outbound web message: a single content item plus correlation hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebMessage {
    pub content: Content,
    pub chat_id: Option<String>,
    pub platform_chat_id: Option<String>,
    pub bot_username: Option<String>,
    pub prefix_with_bot_name: bool,
}

impl WebMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_content(Content::text(text))
    }

    pub fn audio(bytes: &[u8], filename: impl Into<String>, mimetype: impl Into<String>) -> Self {
        Self::with_content(Content::audio(bytes, filename, mimetype))
    }

    fn with_content(content: Content) -> Self {
        Self {
            content,
            chat_id: None,
            platform_chat_id: None,
            bot_username: None,
            prefix_with_bot_name: false,
        }
    }

    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    pub fn with_platform_chat_id(mut self, platform_chat_id: Option<String>) -> Self {
        self.platform_chat_id = platform_chat_id;
        self
    }

    pub fn with_bot_username(mut self, bot_username: Option<String>) -> Self {
        self.bot_username = bot_username;
        self
    }

    pub fn prefixed_with_bot_name(mut self, prefix: bool) -> Self {
        self.prefix_with_bot_name = prefix;
        self
    }

    pub fn into_update(self) -> UpdateIn {
        UpdateIn {
            platform: Platform::Web,
            chat_id: self.chat_id,
            platform_chat_id: self.platform_chat_id,
            messages: vec![Message::user(vec![self.content])],
            bot_username: self.bot_username,
            prefix_with_bot_name: self.prefix_with_bot_name,
        }
    }
}

/// Fully buffered response: status, content type and body text.
struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

impl Reply {
    async fn read(response: Response) -> Result<Self, MabotError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn is_json(&self) -> bool {
        is_json_content_type(self.content_type.as_deref())
    }
}

#[derive(Clone, Copy)]
enum RequestBody<'a> {
    Form(&'a [(&'a str, &'a str)]),
    Json(&'a Value),
}

impl MabotClient {
    pub fn new(config: MabotConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, MabotError> {
        let base = BasePath::new(&config.base_url);
        validate_base_url(&base.current())?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            config,
            base: Mutex::new(base),
            store,
            refresh_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &MabotConfig {
        &self.config
    }

    /// Base URL every request currently goes to.
    pub fn base_url(&self) -> String {
        lock_unpoisoned(&self.base).current()
    }

    pub fn base_mode(&self) -> BaseMode {
        lock_unpoisoned(&self.base).mode()
    }

    /// True iff both tokens are present in the credential store.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some() && self.refresh_token().is_some()
    }

    pub fn logout(&self) {
        self.clear_token(ACCESS_TOKEN_KEY);
        self.clear_token(REFRESH_TOKEN_KEY);
        debug!("cleared stored MABOT tokens");
    }

    /// Password-grant login against `/auth/login`.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), MabotError> {
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];

        let primary = self
            .post(&self.base_url(), LOGIN_PATH, RequestBody::Form(&form), None)
            .await?;
        if !primary.is_success() {
            return Err(MabotError::auth(
                Some(primary.status),
                format!("login rejected: {}", excerpt(&primary.body)),
            ));
        }

        let reply = if primary.is_json() {
            primary
        } else {
            let Some(fallback) = self.fallback_base() else {
                return Err(MabotError::auth(
                    Some(primary.status),
                    format!("login returned non-JSON: {}", excerpt(&primary.body)),
                ));
            };
            debug!(%fallback, "login returned non-JSON; retrying against fallback base");
            let reply = self
                .post(&fallback, LOGIN_PATH, RequestBody::Form(&form), None)
                .await?;
            if !reply.is_success() {
                return Err(MabotError::auth(
                    Some(reply.status),
                    format!("login rejected (fallback): {}", excerpt(&reply.body)),
                ));
            }
            if !reply.is_json() {
                return Err(MabotError::auth(
                    Some(reply.status),
                    format!("login returned non-JSON (fallback): {}", excerpt(&reply.body)),
                ));
            }
            self.switch_to_fallback();
            reply
        };

        let token = serde_json::from_str::<Token>(&reply.body).map_err(|error| {
            MabotError::auth(Some(reply.status), format!("unusable token payload: {error}"))
        })?;
        if token.access_token.trim().is_empty() || token.refresh_token.trim().is_empty() {
            return Err(MabotError::auth(
                Some(reply.status),
                "token payload is missing access or refresh token",
            ));
        }

        self.store_tokens(&token.access_token, &token.refresh_token);
        info!(base = %self.base_url(), "logged in to MABOT gateway");
        Ok(())
    }

    /// Post a full envelope to `/io/input`.
    pub async fn send_update(&self, update: &UpdateIn) -> Result<UpdateOut, MabotError> {
        let body = serde_json::to_value(update)?;
        self.authorized_post(INPUT_PATH, &body).await
    }

    pub async fn send_web_message(&self, message: WebMessage) -> Result<UpdateOut, MabotError> {
        self.send_update(&message.into_update()).await
    }

    async fn authorized_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, MabotError> {
        let sent_token = self.access_token();
        let mut reply = self
            .post(
                &self.base_url(),
                path,
                RequestBody::Json(body),
                sent_token.as_deref(),
            )
            .await?;

        if reply.status == StatusCode::UNAUTHORIZED && self.refresh_token().is_some() {
            debug!(path, "access token rejected; refreshing once");
            self.refresh_after_unauthorized(sent_token.as_deref())
                .await?;
            reply = self
                .post(
                    &self.base_url(),
                    path,
                    RequestBody::Json(body),
                    self.access_token().as_deref(),
                )
                .await?;
        }

        if !reply.is_success() {
            let Some(fallback) = self.fallback_base() else {
                return Err(MabotError::request(reply.status, &reply.body));
            };
            debug!(path, status = %reply.status, %fallback, "request failed; retrying against fallback base");
            let fallback_reply = self
                .post(
                    &fallback,
                    path,
                    RequestBody::Json(body),
                    self.access_token().as_deref(),
                )
                .await?;
            if !fallback_reply.is_success() {
                return Err(MabotError::request(reply.status, &reply.body));
            }
            self.switch_to_fallback();
            reply = fallback_reply;
        }

        if !reply.is_json() {
            let Some(fallback) = self.fallback_base() else {
                return Err(MabotError::format(reply.status, excerpt(&reply.body)));
            };
            debug!(path, %fallback, "non-JSON response; retrying against fallback base");
            let fallback_reply = self
                .post(
                    &fallback,
                    path,
                    RequestBody::Json(body),
                    self.access_token().as_deref(),
                )
                .await?;
            if !fallback_reply.is_success() {
                return Err(MabotError::format(
                    fallback_reply.status,
                    format!("fallback failed: {}", excerpt(&fallback_reply.body)),
                ));
            }
            if !fallback_reply.is_json() {
                return Err(MabotError::format(
                    fallback_reply.status,
                    format!("after fallback: {}", excerpt(&fallback_reply.body)),
                ));
            }
            self.switch_to_fallback();
            reply = fallback_reply;
        }

        serde_json::from_str(&reply.body).map_err(|error| {
            MabotError::format(reply.status, format!("invalid JSON body: {error}"))
        })
    }

    /// Serializes refreshes; a caller that lost the race reuses the winner's tokens.
    async fn refresh_after_unauthorized(&self, sent_token: Option<&str>) -> Result<(), MabotError> {
        let _gate = self.refresh_gate.lock().await;
        if self.access_token().as_deref() != sent_token {
            debug!("tokens already refreshed by a concurrent request");
            return Ok(());
        }
        self.refresh_tokens().await
    }

    async fn refresh_tokens(&self) -> Result<(), MabotError> {
        let Some(refresh_token) = self.refresh_token() else {
            return Err(MabotError::auth(None, "no refresh token available"));
        };
        let body = json!({ "refresh_token": refresh_token });

        let primary = self
            .post(&self.base_url(), REFRESH_PATH, RequestBody::Json(&body), None)
            .await?;
        let outcome = if primary.is_success() {
            Ok(primary)
        } else {
            match self.fallback_base() {
                Some(fallback) => {
                    debug!(%fallback, status = %primary.status, "refresh failed; retrying against fallback base");
                    let reply = self
                        .post(&fallback, REFRESH_PATH, RequestBody::Json(&body), None)
                        .await?;
                    if reply.is_success() {
                        self.switch_to_fallback();
                        Ok(reply)
                    } else {
                        Err(reply)
                    }
                }
                None => Err(primary),
            }
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(rejected) => {
                warn!(status = %rejected.status, "refresh rejected; logging out");
                self.logout();
                return Err(MabotError::auth(
                    Some(rejected.status),
                    format!("refresh rejected: {}", excerpt(&rejected.body)),
                ));
            }
        };

        match parse_refreshed_tokens(&reply.body) {
            Some((access, refresh)) => {
                self.store_tokens(&access, &refresh);
                debug!("stored refreshed tokens");
            }
            None => debug!("refresh issued no new tokens; keeping existing pair"),
        }
        Ok(())
    }

    async fn post(
        &self,
        base: &str,
        path: &str,
        body: RequestBody<'_>,
        access_token: Option<&str>,
    ) -> Result<Reply, MabotError> {
        let content_type = match body {
            RequestBody::Form(_) => MIME_FORM,
            RequestBody::Json(_) => MIME_JSON,
        };
        let headers = to_header_map(build_headers(&self.config, access_token, content_type))?;
        let request = self.http.post(format!("{base}{path}")).headers(headers);
        let request = match body {
            RequestBody::Form(form) => request.form(form),
            RequestBody::Json(value) => request.json(value),
        };

        let response = request.send().await?;
        Reply::read(response).await
    }

    fn fallback_base(&self) -> Option<String> {
        lock_unpoisoned(&self.base).fallback()
    }

    fn switch_to_fallback(&self) {
        let mut base = lock_unpoisoned(&self.base);
        if base.switch_to_fallback() {
            info!(base = %base.current(), "switched to fallback base path");
        }
    }

    fn access_token(&self) -> Option<String> {
        non_empty(self.store.get(ACCESS_TOKEN_KEY))
    }

    fn refresh_token(&self) -> Option<String> {
        non_empty(self.store.get(REFRESH_TOKEN_KEY))
    }

    fn store_tokens(&self, access: &str, refresh: &str) {
        for (key, value) in [(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)] {
            if let Err(error) = self.store.set(key, value) {
                warn!(key, %error, "failed to persist token");
            }
        }
    }

    fn clear_token(&self, key: &str) {
        if let Err(error) = self.store.remove(key) {
            warn!(key, %error, "failed to clear token");
        }
    }
}

impl fmt::Debug for MabotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MabotClient")
            .field("config", &self.config)
            .field("base", &*lock_unpoisoned(&self.base))
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// Empty or unparseable refresh bodies carry no tokens.
fn parse_refreshed_tokens(body: &str) -> Option<(String, String)> {
    if body.trim().is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<PartialToken>(body).ok()?;
    let access = non_empty(parsed.access_token)?;
    let refresh = non_empty(parsed.refresh_token)?;
    Some((access, refresh))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn validate_base_url(base: &str) -> Result<(), MabotError> {
    let parsed = reqwest::Url::parse(base)
        .map_err(|error| MabotError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MabotError::InvalidBaseUrl(format!(
            "{base}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

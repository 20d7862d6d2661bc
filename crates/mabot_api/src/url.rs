/// Path suffix some gateway deployments require in front of every endpoint.
pub const API_SUFFIX: &str = "/api";

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const INPUT_PATH: &str = "/io/input";

/// Which base path the client is currently talking to.
///
/// The only transition is `Primary -> Fallback`; see [`BasePath::switch_to_fallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMode {
    Primary,
    Fallback,
}

/// Trim surrounding whitespace and trailing slashes from a configured base URL.
pub fn normalize_base_url(input: &str) -> String {
    input.trim().trim_end_matches('/').to_string()
}

/// Append [`API_SUFFIX`] unless the base already ends with it.
pub fn with_api_fallback(base: &str) -> String {
    if base.ends_with(API_SUFFIX) {
        base.to_string()
    } else {
        format!("{base}{API_SUFFIX}")
    }
}

/// Configured base URL plus the one-directional primary/fallback mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    primary: String,
    mode: BaseMode,
}

impl BasePath {
    /// A base that already ends in `/api` starts in fallback mode: there is
    /// nothing further to fall back to.
    pub fn new(base_url: &str) -> Self {
        let primary = normalize_base_url(base_url);
        let mode = if primary.ends_with(API_SUFFIX) {
            BaseMode::Fallback
        } else {
            BaseMode::Primary
        };
        Self { primary, mode }
    }

    pub fn mode(&self) -> BaseMode {
        self.mode
    }

    pub fn current(&self) -> String {
        match self.mode {
            BaseMode::Primary => self.primary.clone(),
            BaseMode::Fallback => with_api_fallback(&self.primary),
        }
    }

    /// The alternate base to probe, or `None` once already on the fallback.
    pub fn fallback(&self) -> Option<String> {
        match self.mode {
            BaseMode::Primary => Some(with_api_fallback(&self.primary)),
            BaseMode::Fallback => None,
        }
    }

    /// Returns `true` when the mode actually changed.
    pub fn switch_to_fallback(&mut self) -> bool {
        let changed = self.mode == BaseMode::Primary;
        self.mode = BaseMode::Fallback;
        changed
    }
}

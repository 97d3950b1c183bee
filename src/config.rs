//! Client configuration parsed from environment variables.

use std::time::Duration;

use rand::Rng;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_GOOGLE_REDIRECT_URI: &str = "http://localhost:3000/auth/google/callback";
pub const DEFAULT_NOTICE_TTL_MS: u64 = 3000;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set (or is blank).
    #[error("missing required configuration: env var {var} not set")]
    Missing { var: &'static str },

    /// A configuration value could not be parsed.
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Transport timeouts. `None` falls back to the HTTP client's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Option<Duration>,
    pub connect: Option<Duration>,
}

/// Google OAuth client settings used to build the consent-screen URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleOAuth {
    pub client_id: String,
    pub redirect_uri: String,
}

impl GoogleOAuth {
    /// Build the Google authorization URL for the code flow.
    ///
    /// `state` is an opaque CSRF value echoed back to the callback.
    #[must_use]
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        let scope = GOOGLE_SCOPES.join(" ");
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("prompt", "select_account"),
            ("access_type", "offline"),
            ("scope", scope.as_str()),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{GOOGLE_AUTHORIZE_URL}?{query}")
    }
}

/// Generate a random 16-byte hex OAuth `state` value.
#[must_use]
pub fn generate_oauth_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub google: GoogleOAuth,
    pub timeouts: Timeouts,
    pub notice_ttl: Duration,
    pub coalesce_refresh: bool,
}

impl ClientConfig {
    /// Build a config with defaults for everything except the OAuth client id.
    #[must_use]
    pub fn new(google_client_id: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            google: GoogleOAuth {
                client_id: google_client_id.into(),
                redirect_uri: DEFAULT_GOOGLE_REDIRECT_URI.to_owned(),
            },
            timeouts: Timeouts::default(),
            notice_ttl: Duration::from_millis(DEFAULT_NOTICE_TTL_MS),
            coalesce_refresh: true,
        }
    }

    /// Override the API base origin. Trailing slashes are trimmed.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `MINSOTO_GOOGLE_CLIENT_ID`
    ///
    /// Optional:
    /// - `MINSOTO_API_BASE_URL`: default `http://localhost:8000/api`
    /// - `MINSOTO_GOOGLE_REDIRECT_URI`: default local callback page
    /// - `MINSOTO_REQUEST_TIMEOUT_SECS` / `MINSOTO_CONNECT_TIMEOUT_SECS`
    /// - `MINSOTO_NOTICE_TTL_MS`: default 3000
    /// - `MINSOTO_COALESCE_REFRESH`: default `true`
    ///
    /// # Errors
    ///
    /// Returns an error if the client id is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = std::env::var("MINSOTO_GOOGLE_CLIENT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { var: "MINSOTO_GOOGLE_CLIENT_ID" })?;

        let mut config = Self::new(client_id);
        if let Ok(base_url) = std::env::var("MINSOTO_API_BASE_URL") {
            config = config.with_base_url(&base_url);
        }
        if let Ok(redirect_uri) = std::env::var("MINSOTO_GOOGLE_REDIRECT_URI") {
            config.google.redirect_uri = redirect_uri;
        }
        config.timeouts = Timeouts {
            request: env_parse_opt::<u64>("MINSOTO_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs),
            connect: env_parse_opt::<u64>("MINSOTO_CONNECT_TIMEOUT_SECS")?.map(Duration::from_secs),
        };
        if let Some(ms) = env_parse_opt::<u64>("MINSOTO_NOTICE_TTL_MS")? {
            config.notice_ttl = Duration::from_millis(ms);
        }
        if let Some(coalesce) = env_bool("MINSOTO_COALESCE_REFRESH")? {
            config.coalesce_refresh = coalesce;
        }
        Ok(config)
    }
}

fn env_parse_opt<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(None),
    }
}

pub(crate) fn env_bool(var: &'static str) -> Result<Option<bool>, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

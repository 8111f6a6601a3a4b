use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_URL_VAR: &str = "DATAVIBE_API_URL";
pub const API_TIMEOUT_VAR: &str = "DATAVIBE_API_TIMEOUT_SECS";
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Backend client settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_environment() -> Self {
        Self::resolve(
            std::env::var(API_URL_VAR).ok(),
            std::env::var(API_TIMEOUT_VAR).ok(),
        )
    }

    /// Blank or unparseable overrides fall back to the defaults.
    pub fn resolve(base_url: Option<String>, timeout_secs: Option<String>) -> Self {
        let base_url = non_blank(base_url)
            .map(|url| normalize_base_url(&url))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = timeout_secs
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { base_url, timeout }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Identity provider coordinates. Absent when either value is missing.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl IdentityConfig {
    pub fn from_environment() -> Option<Self> {
        Self::resolve(
            std::env::var(SUPABASE_URL_VAR).ok(),
            std::env::var(SUPABASE_ANON_KEY_VAR).ok(),
        )
    }

    pub fn resolve(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = non_blank(url)?;
        let anon_key = non_blank(anon_key)?;
        Some(Self {
            url: normalize_base_url(&url),
            anon_key,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

//! Relay configuration: YAML file, environment overrides, defaults.

use crate::cache::CacheConfig;
use crate::resilience::rate_limiter::RateLimitConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://text.pollinations.ai";

/// Settings for [`crate::service::GenerationService`].
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes:
///
/// ```yaml
/// base_url: "https://text.pollinations.ai"
/// request_timeout_ms: 30000
/// rate_limit:
///   max_requests: 10
///   window_ms: 60000
/// blacklist: ["competitor"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Root of the text-generation API.
    pub base_url: String,
    /// Deadline for one outbound request, head and body included.
    pub request_timeout_ms: u64,
    /// How long a generated answer stays cached.
    pub text_cache_ttl_ms: u64,
    /// How long the model list stays cached.
    pub models_cache_ttl_ms: u64,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    /// Extra terms added to the prompt filter's custom blacklist at startup.
    pub blacklist: Vec<String>,
    /// Client identifier the rate-limit key is derived from.
    pub user_agent: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            text_cache_ttl_ms: 10 * 60 * 1000,
            models_cache_ttl_ms: 60 * 60 * 1000,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            blacklist: Vec::new(),
            user_agent: None,
        }
    }
}

pub(crate) fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        Error::configuration_with_context(
            format!("cannot parse environment variable {}", name),
            ErrorContext::new()
                .with_field_path(name)
                .with_details(format!("value: {:?}", raw))
                .with_source("config"),
        )
    })
}

impl RelayConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Defaults with `TEXTGEN_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Recognised: `TEXTGEN_BASE_URL`, `TEXTGEN_TIMEOUT_MS`,
    /// `TEXTGEN_TEXT_CACHE_TTL_MS`, `TEXTGEN_CACHE_MAX_ENTRIES`,
    /// `TEXTGEN_RATE_LIMIT`, `TEXTGEN_RATE_WINDOW_MS`, `TEXTGEN_USER_AGENT`.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TEXTGEN_BASE_URL") {
            self.base_url = v.trim().to_string();
        }
        if let Some(v) = lookup("TEXTGEN_TIMEOUT_MS") {
            self.request_timeout_ms = parse_var("TEXTGEN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_TEXT_CACHE_TTL_MS") {
            self.text_cache_ttl_ms = parse_var("TEXTGEN_TEXT_CACHE_TTL_MS", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_var("TEXTGEN_CACHE_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_RATE_LIMIT") {
            self.rate_limit.max_requests = parse_var("TEXTGEN_RATE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_RATE_WINDOW_MS") {
            self.rate_limit.window_ms = parse_var("TEXTGEN_RATE_WINDOW_MS", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_USER_AGENT") {
            let v = v.trim();
            self.user_agent = (!v.is_empty()).then(|| v.to_string());
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.request_timeout_ms == 0 {
            return Err(Error::validation_with_context(
                "request timeout must be greater than zero",
                ErrorContext::new()
                    .with_field_path("request_timeout_ms")
                    .with_source("config"),
            ));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(Error::validation_with_context(
                "rate-limit window must be greater than zero",
                ErrorContext::new()
                    .with_field_path("rate_limit.window_ms")
                    .with_source("config"),
            ));
        }
        Ok(())
    }

    /// Parsed [`RelayConfig::base_url`]; must be an absolute http(s) URL.
    pub fn base_url(&self) -> Result<Url> {
        let invalid = |details: String| {
            Error::configuration_with_context(
                "invalid base URL",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(details)
                    .with_source("config"),
            )
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(invalid(format!("unsupported URL: {}", self.base_url)));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn text_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.text_cache_ttl_ms)
    }

    pub fn models_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.models_cache_ttl_ms)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

use super::{caller_key, GenerationService};
use crate::cache::ResponseCache;
use crate::config::RelayConfig;
use crate::guardrails::PromptFilter;
use crate::resilience::rate_limiter::SlidingWindowLimiter;
use crate::transport::{HttpTransport, HttpTransportConfig, TextTransport};
use crate::Result;
use std::sync::Arc;

/// Builder for [`GenerationService`].
///
/// Every collaborator can be injected; anything left unset is created from the
/// [`RelayConfig`]. Sharing one cache or limiter between services is done by
/// passing the same `Arc` to each builder.
pub struct GenerationServiceBuilder {
    config: RelayConfig,
    cache: Option<Arc<ResponseCache>>,
    rate_limiter: Option<Arc<SlidingWindowLimiter>>,
    prompt_filter: Option<Arc<PromptFilter>>,
    transport: Option<Arc<dyn TextTransport>>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl GenerationServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            cache: None,
            rate_limiter: None,
            prompt_filter: None,
            transport: None,
            base_url_override: None,
        }
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<SlidingWindowLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn prompt_filter(mut self, filter: Arc<PromptFilter>) -> Self {
        self.prompt_filter = Some(filter);
        self
    }

    /// Replace the HTTP transport, e.g. with an in-process fake.
    pub fn transport(mut self, transport: Arc<dyn TextTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the client identifier the rate-limit key is derived from.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Override the configured base URL.
    ///
    /// This is primarily for testing with mock servers.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn build(self) -> Result<GenerationService> {
        let mut config = self.config;
        if let Some(base_url) = self.base_url_override {
            config.base_url = base_url;
        }
        config.validate()?;
        let base_url = config.base_url()?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResponseCache::from_config(&config.cache)));
        let limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone())));
        let filter = self
            .prompt_filter
            .unwrap_or_else(|| Arc::new(PromptFilter::new()));
        if !config.blacklist.is_empty() {
            filter.add_to_blacklist(&config.blacklist);
        }

        let transport: Arc<dyn TextTransport> = match self.transport {
            Some(t) => t,
            None => {
                let mut http = HttpTransportConfig::from_env()?;
                if let Some(ua) = &config.user_agent {
                    http = http.with_user_agent(ua.clone());
                }
                Arc::new(HttpTransport::new(&http)?)
            }
        };

        let caller_key = caller_key(config.user_agent.as_deref());

        Ok(GenerationService {
            config,
            base_url,
            cache,
            limiter,
            filter,
            transport,
            caller_key,
        })
    }
}

impl Default for GenerationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

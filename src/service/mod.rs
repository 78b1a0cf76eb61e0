//! 生成服务：限流、过滤、缓存与超时请求的编排。
//!
//! # Generation Service
//!
//! [`GenerationService::generate_text`] is the single entry point the chat UI
//! calls. Each call runs these steps in order and stops at the first failure:
//!
//! 1. reject blank prompts (`InvalidInput`)
//! 2. admit the caller through the sliding window (`RateLimited`)
//! 3. redact blacklisted words; the redacted prompt is used from here on
//! 4. return a cached answer for the same prompt and options, if any
//! 5. fetch `GET {base}/prompt/{prompt}?{options}` under the request deadline
//!    (`NetworkError`, `EmptyResponse`)
//! 6. cache the answer and return it
//!
//! The failure kinds are the variants of [`crate::GenerationErrorKind`].
//!
//! Failures are returned as [`GenerationResult`] values, never as `Err`.
//! There are no internal retries, and concurrent identical requests are not
//! coalesced: both fetch and the later write wins.
//!
//! ```rust,no_run
//! use textgen_relay::service::{GenerationServiceBuilder, TextGenerationOptions};
//!
//! # async fn demo() -> textgen_relay::Result<()> {
//! let service = GenerationServiceBuilder::new()
//!     .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
//!     .build()?;
//!
//! let options = TextGenerationOptions::new().with_model("openai");
//! let result = service.generate_text("Which plan suits streaming?", &options).await;
//! if let Some(answer) = result.data() {
//!     println!("{answer} (cached: {})", result.is_cached());
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod options;
mod result;

pub use builder::GenerationServiceBuilder;
pub use options::TextGenerationOptions;
pub use result::GenerationResult;

use crate::cache::{CacheKey, ResponseCache};
use crate::config::RelayConfig;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::guardrails::PromptFilter;
use crate::resilience::rate_limiter::SlidingWindowLimiter;
use crate::transport::{FetchedBody, TextTransport};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Rate-limit key used when no user agent is known.
pub const DEFAULT_CALLER_KEY: &str = "default_user";
/// Voice used by [`GenerationService::generate_audio`] when none is given.
pub const DEFAULT_VOICE: &str = "alloy";

const AUDIO_MODEL: &str = "openai-audio";
const MODELS_CACHE_KEY: &str = "text-models";

/// Characters left raw in a path segment: ASCII alphanumerics and `-_.!~*'()`.
const PATH_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Derive the rate-limit key from a user-agent string.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`. This is a coarse client
/// fingerprint, not an authenticated identity.
pub fn caller_key(user_agent: Option<&str>) -> String {
    match user_agent {
        Some(ua) => {
            let cleaned: String = ua
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            format!("browser_{}", cleaned)
        }
        None => DEFAULT_CALLER_KEY.to_string(),
    }
}

/// A model advertised by the provider's `/models` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawModel")]
pub struct TextModel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The endpoint lists either bare names or objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawModel {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<RawModel> for TextModel {
    fn from(raw: RawModel) -> Self {
        match raw {
            RawModel::Name(name) => TextModel {
                name,
                description: None,
            },
            RawModel::Detailed { name, description } => TextModel { name, description },
        }
    }
}

fn looks_like_error(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["error", "failed", "sorry"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Relay to the text-generation API with caching, rate limiting and filtering.
pub struct GenerationService {
    config: RelayConfig,
    base_url: Url,
    cache: Arc<ResponseCache>,
    limiter: Arc<SlidingWindowLimiter>,
    filter: Arc<PromptFilter>,
    transport: Arc<dyn TextTransport>,
    caller_key: String,
}

impl GenerationService {
    pub fn builder() -> GenerationServiceBuilder {
        GenerationServiceBuilder::new()
    }

    /// Generate text for `prompt`, from cache when possible.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &TextGenerationOptions,
    ) -> GenerationResult {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("generate_text", request_id = request_id.as_str());
        self.generate_text_inner(prompt, options, &request_id)
            .instrument(span)
            .await
    }

    async fn generate_text_inner(
        &self,
        prompt: &str,
        options: &TextGenerationOptions,
        request_id: &str,
    ) -> GenerationResult {
        let filtered = match self.admit(prompt) {
            Ok(filtered) => filtered,
            Err(err) => return err.into(),
        };

        let endpoint = match self.endpoint(&["prompt", filtered.as_str()]) {
            Ok(url) => url,
            Err(err) => return err.into(),
        };
        let params = options.query_params();
        let cache_key = CacheKey::for_request(endpoint.as_str(), &params);
        debug!(cache_key = cache_key.as_str(), "cache probe");

        if let Some(hit) = self.cache.get(cache_key.as_str()) {
            debug!("returning cached result");
            return GenerationResult::from_cache(hit);
        }

        let url = with_query(endpoint, &params);
        let start = Instant::now();
        let fetched = match self.fetch(&url, Some(request_id)).await {
            Ok(fetched) => fetched,
            Err(err) => return err.into(),
        };

        let text = fetched.text();
        if text.trim().is_empty() {
            warn!(http_status = fetched.status, "empty response from text endpoint");
            return GenerationError::empty_response().into();
        }
        if looks_like_error(&text) {
            let preview: String = text.chars().take(200).collect();
            warn!(preview = preview.as_str(), "response may contain an error message");
        }

        self.cache
            .set_with_ttl(cache_key.as_str(), text.clone(), self.config.text_cache_ttl());

        info!(
            http_status = fetched.status,
            bytes = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            transport = self.transport.name(),
            "text generated"
        );
        GenerationResult::fresh(text)
    }

    /// Speak `prompt` with the provider's audio model. Answers are never cached.
    pub async fn generate_audio(&self, prompt: &str, voice: Option<&str>) -> GenerationResult<Bytes> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("generate_audio", request_id = request_id.as_str());
        async {
            let filtered = match self.admit(prompt) {
                Ok(filtered) => filtered,
                Err(err) => return GenerationResult::failure(err),
            };
            let endpoint = match self.endpoint(&[filtered.as_str()]) {
                Ok(url) => url,
                Err(err) => return GenerationResult::failure(err),
            };
            let mut params = BTreeMap::new();
            params.insert("model", AUDIO_MODEL.to_string());
            params.insert("voice", voice.unwrap_or(DEFAULT_VOICE).to_string());
            let url = with_query(endpoint, &params);

            let fetched = match self.fetch(&url, Some(&request_id)).await {
                Ok(fetched) => fetched,
                Err(err) => return GenerationResult::failure(err),
            };
            if fetched.body.is_empty() {
                return GenerationResult::failure(GenerationError::empty_response());
            }
            info!(bytes = fetched.body.len(), "audio generated");
            GenerationResult::fresh(fetched.body)
        }
        .instrument(span)
        .await
    }

    /// Models offered by the provider, cached for the configured models TTL.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn text_models(&self) -> Vec<TextModel> {
        if let Some(cached) = self.cache.get(MODELS_CACHE_KEY) {
            match serde_json::from_str::<Vec<TextModel>>(&cached) {
                Ok(models) => return models,
                Err(e) => warn!(error = %e, "discarding unreadable cached model list"),
            }
        }

        let Ok(url) = self.endpoint(&["models"]) else {
            return Vec::new();
        };
        let fetched = match self.fetch(&url, None).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(error = %err, "error fetching text models");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<TextModel>>(&fetched.body) {
            Ok(models) => {
                self.cache.set_with_ttl(
                    MODELS_CACHE_KEY,
                    fetched.text(),
                    self.config.models_cache_ttl(),
                );
                models
            }
            Err(e) => {
                warn!(error = %e, "model list is not a JSON array");
                Vec::new()
            }
        }
    }

    /// Recent public prompts from the provider's feed.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn text_feed(&self) -> Vec<serde_json::Value> {
        let Ok(url) = self.endpoint(&["feed"]) else {
            return Vec::new();
        };
        let fetched = match self.fetch(&url, None).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(error = %err, "error fetching text feed");
                return Vec::new();
            }
        };
        serde_json::from_slice(&fetched.body).unwrap_or_else(|e| {
            warn!(error = %e, "text feed is not a JSON array");
            Vec::new()
        })
    }

    /// Validate, admit and sanitize a prompt.
    fn admit(&self, prompt: &str) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            warn!("rejecting empty prompt");
            return Err(GenerationError::invalid_input());
        }

        if !self.limiter.is_allowed(&self.caller_key) {
            let snapshot = self.limiter.snapshot(&self.caller_key);
            warn!(
                caller_key = self.caller_key.as_str(),
                retry_after_ms = snapshot.retry_after.map(|d| d.as_millis() as u64),
                "rate limit exceeded"
            );
            return Err(GenerationError::rate_limited());
        }

        Ok(self.filter.filter_prompt(prompt))
    }

    /// GET `url` under the request deadline, requiring a 2xx status.
    async fn fetch(&self, url: &Url, request_id: Option<&str>) -> Result<FetchedBody, GenerationError> {
        let timeout = self.config.request_timeout();
        let fetched = self
            .transport
            .get(url, timeout, request_id)
            .await
            .map_err(|e| {
                warn!(url = url.as_str(), error = %e, timed_out = e.is_timeout(), "request failed");
                GenerationError::from(e)
            })?;

        if !fetched.is_success() {
            let body = fetched.text();
            warn!(http_status = fetched.status, url = url.as_str(), "HTTP error");
            return Err(GenerationError::http_status(fetched.status, &body));
        }
        Ok(fetched)
    }

    /// Base URL with `segments` appended, each encoded as one path segment.
    ///
    /// A segment that encodes to `.` or `..` would be collapsed by URL
    /// normalization and cannot be addressed, so it is rejected.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GenerationError> {
        let mut path = self.base_url.path().trim_end_matches('/').to_string();
        for segment in segments {
            let encoded = utf8_percent_encode(segment, PATH_COMPONENT).to_string();
            if encoded == "." || encoded == ".." {
                return Err(GenerationError::new(
                    GenerationErrorKind::InvalidInput,
                    "Prompt cannot be a bare '.' or '..'",
                ));
            }
            path.push('/');
            path.push_str(&encoded);
        }
        let mut url = self.base_url.clone();
        url.set_path(&path);
        Ok(url)
    }

    /// Drop every cached answer.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn add_to_blacklist<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter.add_to_blacklist(words);
    }

    pub fn is_safe_prompt(&self, prompt: &str) -> bool {
        self.filter.is_safe_prompt(prompt)
    }

    /// Forget this caller's request history.
    pub fn reset_rate_limit(&self) {
        self.limiter.reset(&self.caller_key);
    }

    pub fn caller_key(&self) -> &str {
        &self.caller_key
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    pub fn prompt_filter(&self) -> &Arc<PromptFilter> {
        &self.filter
    }
}

fn with_query<V: AsRef<str>>(mut url: Url, params: &BTreeMap<&str, V>) -> Url {
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_ref())));
    }
    url
}

static GLOBAL: OnceCell<GenerationService> = OnceCell::new();

/// Process-wide service built from [`RelayConfig::from_env`] on first use.
pub fn global() -> crate::Result<&'static GenerationService> {
    GLOBAL.get_or_try_init(|| {
        GenerationServiceBuilder::new()
            .config(RelayConfig::from_env()?)
            .build()
    })
}

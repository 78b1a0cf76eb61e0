//! # textgen-relay
//!
//! 面向纯文本生成 API 的客户端中继：缓存、限流与提示词过滤。
//!
//! Client-side relay for a plain-text generation API. Prompts are validated,
//! rate limited per caller, scrubbed of blacklisted words, answered from a
//! bounded TTL cache when possible and otherwise fetched over HTTP under a
//! deadline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use textgen_relay::{GenerationServiceBuilder, TextGenerationOptions};
//!
//! #[tokio::main]
//! async fn main() -> textgen_relay::Result<()> {
//!     let service = GenerationServiceBuilder::new().build()?;
//!
//!     let options = TextGenerationOptions::new().with_model("openai");
//!     let result = service.generate_text("What speeds do you offer?", &options).await;
//!     match result.into_result() {
//!         Ok((text, cached)) => println!("{text} (cached: {cached})"),
//!         Err(err) => eprintln!("{}: {}", err.kind, err.message),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`service`] | Generation pipeline and its builder |
//! | [`cache`] | Bounded TTL response cache |
//! | [`resilience`] | Sliding-window rate limiting |
//! | [`guardrails`] | Whole-word prompt blacklist |
//! | [`transport`] | Deadline-bounded HTTP GET |
//! | [`assistant`] | Chat replies with canned fallbacks |
//! | [`config`] | YAML and environment configuration |

pub mod assistant;
pub mod cache;
pub mod config;
pub mod guardrails;
pub mod resilience;
pub mod service;
pub mod transport;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, GenerationError, GenerationErrorKind};

pub use config::RelayConfig;
pub use service::{
    GenerationResult, GenerationService, GenerationServiceBuilder, TextGenerationOptions,
};

use tracing::warn;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Generate text through the process-wide service.
///
/// A configuration error while building that service is reported as a
/// `NetworkError` result.
pub async fn generate_text(prompt: &str, options: &TextGenerationOptions) -> GenerationResult {
    match service::global() {
        Ok(service) => service.generate_text(prompt, options).await,
        Err(err) => {
            warn!(error = %err, "default service unavailable");
            GenerationError::network(err.to_string()).into()
        }
    }
}

/// Drop every cached answer held by the process-wide service.
pub fn clear_cache() {
    clear_cache_in(service::global());
}

/// Extend the process-wide prompt blacklist.
pub fn add_to_blacklist<I, S>(words: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    add_to_blacklist_in(service::global(), words);
}

fn clear_cache_in(target: Result<&GenerationService>) {
    match target {
        Ok(service) => service.clear_cache(),
        Err(err) => warn!(error = %err, "cache not cleared: default service unavailable"),
    }
}

fn add_to_blacklist_in<I, S>(target: Result<&GenerationService>, words: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match target {
        Ok(service) => service.add_to_blacklist(words),
        Err(err) => {
            let dropped: Vec<String> = words.into_iter().map(|w| w.as_ref().to_string()).collect();
            warn!(error = %err, ?dropped, "blacklist terms not added: default service unavailable");
        }
    }
}

/// Whether the process-wide filter leaves `prompt` untouched.
///
/// Falls back to the built-in blacklist when the process-wide service
/// cannot be built.
pub fn is_safe_prompt(prompt: &str) -> bool {
    match service::global() {
        Ok(service) => service.is_safe_prompt(prompt),
        Err(err) => {
            warn!(error = %err, "default service unavailable; using built-in blacklist");
            guardrails::PromptFilter::new().is_safe_prompt(prompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_logs(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.text()
    }

    fn unavailable() -> Error {
        Error::configuration_with_context(
            "invalid base URL",
            ErrorContext::new().with_field_path("base_url"),
        )
    }

    #[test]
    fn test_unavailable_default_service_is_logged() {
        let logs = with_captured_logs(|| {
            add_to_blacklist_in(Err(unavailable()), ["rival"]);
            clear_cache_in(Err(unavailable()));
        });
        assert!(logs.contains("blacklist terms not added"));
        assert!(logs.contains("rival"));
        assert!(logs.contains("cache not cleared"));
        assert!(logs.contains("invalid base URL"));
    }

    #[test]
    fn test_available_service_receives_admin_calls() {
        let service = GenerationServiceBuilder::new().build().unwrap();
        service.cache().set("k", "v".to_string());

        add_to_blacklist_in(Ok(&service), ["rival"]);
        clear_cache_in(Ok(&service));
        assert!(!service.is_safe_prompt("a rival offer"));
        assert!(service.cache().is_empty());
    }
}

//! 内容安全模块：基于黑名单的提示词过滤。
//!
//! # Guardrails Module
//!
//! Deterministic prompt sanitizing against a built-in blacklist plus terms the
//! host application adds at runtime.
//!
//! ## Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`PromptFilter`] | Static + custom blacklist, redacts whole words |
//! | [`WordFilter`] | One escaped literal term with whole-word matching |
//!
//! ## Example
//!
//! ```rust
//! use textgen_relay::guardrails::PromptFilter;
//!
//! let filter = PromptFilter::new();
//! assert_eq!(filter.filter_prompt("Hello World"), "Hello World");
//! assert_eq!(filter.filter_prompt("I will kill the bug"), "i will [REMOVED] the bug");
//!
//! filter.add_to_blacklist(["Crypto"]);
//! assert!(!filter.is_safe_prompt("buy crypto now"));
//! ```
//!
//! ## Output casing
//!
//! Matching runs on the lower-cased prompt. When nothing is redacted the
//! original prompt is returned untouched; when something is redacted the
//! lower-cased, redacted text is returned.

mod filters;

pub use filters::WordFilter;

use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Token substituted for every redacted term.
pub const REDACTION_TOKEN: &str = "[REMOVED]";

/// Terms redacted by [`PromptFilter::new`].
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "violence",
    "hate",
    "explicit",
    "adult",
    "nsfw",
    "porn",
    "sex",
    "nude",
    "weapon",
    "drug",
    "illegal",
    "hack",
    "malware",
    "spam",
    "scam",
    "terrorist",
    "murder",
    "kill",
    "death",
    "suicide",
    "self-harm",
    "racist",
    "discrimination",
    "offensive",
    "harassment",
    "bullying",
];

/// Prompt sanitizer with a fixed blacklist and a grow-only custom blacklist.
#[derive(Debug)]
pub struct PromptFilter {
    static_terms: Vec<WordFilter>,
    custom_terms: RwLock<Vec<WordFilter>>,
}

fn normalize(word: &str) -> Option<String> {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        None
    } else {
        Some(word)
    }
}

fn compile(term: String) -> Option<WordFilter> {
    match WordFilter::new(term.clone()) {
        Ok(filter) => Some(filter),
        Err(e) => {
            warn!(term = term.as_str(), error = %e, "skipping blacklist term");
            None
        }
    }
}

impl PromptFilter {
    /// Filter with [`DEFAULT_BLACKLIST`] as its static terms.
    pub fn new() -> Self {
        Self::with_static_terms(DEFAULT_BLACKLIST.iter().copied())
    }

    /// Filter with the given static terms and an empty custom blacklist.
    pub fn with_static_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut static_terms: Vec<WordFilter> = Vec::new();
        for term in terms.into_iter().filter_map(|t| normalize(t.as_ref())) {
            if static_terms.iter().any(|f| f.term() == term) {
                continue;
            }
            if let Some(filter) = compile(term) {
                static_terms.push(filter);
            }
        }
        Self {
            static_terms,
            custom_terms: RwLock::new(Vec::new()),
        }
    }

    /// Add terms to the custom blacklist. Terms are trimmed and lower-cased;
    /// blanks and terms already present are ignored.
    pub fn add_to_blacklist<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut custom = self
            .custom_terms
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for word in words.into_iter().filter_map(|w| normalize(w.as_ref())) {
            let known = self.static_terms.iter().any(|f| f.term() == word)
                || custom.iter().any(|f| f.term() == word);
            if known {
                continue;
            }
            if let Some(filter) = compile(word) {
                debug!(term = filter.term(), "blacklist term added");
                custom.push(filter);
            }
        }
    }

    /// Terms added through [`PromptFilter::add_to_blacklist`], in insertion order.
    pub fn custom_terms(&self) -> Vec<String> {
        self.custom_terms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|f| f.term().to_string())
            .collect()
    }

    /// Redact blacklisted whole words.
    ///
    /// Returns `prompt` unchanged when nothing matched, otherwise the
    /// lower-cased prompt with each match replaced by [`REDACTION_TOKEN`].
    pub fn filter_prompt(&self, prompt: &str) -> String {
        let lowered = prompt.to_lowercase();
        let mut filtered = lowered.clone();

        for filter in &self.static_terms {
            filtered = filter.sanitize(&filtered, REDACTION_TOKEN);
        }
        {
            let custom = self
                .custom_terms
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for filter in custom.iter() {
                filtered = filter.sanitize(&filtered, REDACTION_TOKEN);
            }
        }

        if filtered == lowered {
            prompt.to_string()
        } else {
            debug!(original = prompt, filtered = filtered.as_str(), "prompt redacted");
            filtered
        }
    }

    /// True when [`PromptFilter::filter_prompt`] leaves the prompt untouched.
    pub fn is_safe_prompt(&self, prompt: &str) -> bool {
        self.filter_prompt(prompt) == prompt
    }

    /// Blacklist terms that occur as whole words in `prompt`.
    pub fn matched_terms(&self, prompt: &str) -> Vec<String> {
        let lowered = prompt.to_lowercase();
        let custom = self
            .custom_terms
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.static_terms
            .iter()
            .chain(custom.iter())
            .filter(|f| f.is_match(&lowered))
            .map(|f| f.term().to_string())
            .collect()
    }
}

impl Default for PromptFilter {
    fn default() -> Self {
        Self::new()
    }
}

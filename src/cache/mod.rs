//! 响应缓存模块：带 TTL 与容量上限的内存缓存。
//!
//! # Response Cache Module
//!
//! In-memory response caching that lets repeated prompts skip the network.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TtlCache`] | Bounded key/value store with per-entry TTL |
//! | [`CacheConfig`] | Capacity and default TTL |
//! | [`CacheStats`] | Hit/miss/set/eviction counters |
//! | [`CacheKey`] | Deterministic key from endpoint plus request options |
//!
//! ## Example
//!
//! ```rust
//! use textgen_relay::cache::TtlCache;
//! use std::time::Duration;
//!
//! let cache: TtlCache<String> = TtlCache::new(100, Duration::from_secs(300));
//! cache.set("greeting", "hello".to_string());
//! assert_eq!(cache.get("greeting").as_deref(), Some("hello"));
//! ```
//!
//! ## Expiry and eviction
//!
//! Expiry is lazy: an expired entry is removed when it is read, or swept at
//! the start of the next write. After every write the store is trimmed back to
//! its capacity by removing the entries with the oldest insertion time.

mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheConfig, CacheStats, TtlCache};

/// Cache used by the generation service: response bodies keyed by request.
pub type ResponseCache = TtlCache<String>;

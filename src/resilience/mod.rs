//! 弹性模式模块：按调用方划分的滑动窗口限流。
//!
//! # Resilience Primitives Module
//!
//! Admission control for outbound generation requests.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Per-key sliding-window rate limiter |
//!
//! ## Rate Limiter
//!
//! Only requests inside the trailing window count toward the limit, and each
//! key has its own window:
//!
//! ```rust
//! use textgen_relay::resilience::rate_limiter::{RateLimitConfig, SlidingWindowLimiter};
//! use std::time::Duration;
//!
//! let config = RateLimitConfig::new()
//!     .with_max_requests(2)
//!     .with_window(Duration::from_secs(1));
//! let limiter = SlidingWindowLimiter::new(config);
//!
//! assert!(limiter.is_allowed("client-a"));
//! assert!(limiter.is_allowed("client-a"));
//! assert!(!limiter.is_allowed("client-a"));
//! assert!(limiter.is_allowed("client-b"));
//! ```

pub mod rate_limiter;

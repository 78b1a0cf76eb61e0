//! Mock HTTP server setup for integration tests

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use std::time::Duration;
use textgen_relay::resilience::rate_limiter::RateLimitConfig;
use textgen_relay::{GenerationService, GenerationServiceBuilder, RelayConfig};

/// Test fixture that owns a mock text API.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Service using the real HTTP transport against the mock server.
    pub fn service(&self) -> GenerationService {
        self.service_with(RelayConfig::default())
    }

    pub fn service_with(&self, config: RelayConfig) -> GenerationService {
        GenerationServiceBuilder::new()
            .config(config.with_request_timeout(Duration::from_secs(5)))
            .base_url_override(&self.base_url)
            .build()
            .expect("service builds against mock server")
    }

    pub fn limited_service(&self, max_requests: usize) -> GenerationService {
        self.service_with(
            RelayConfig::default()
                .with_rate_limit(RateLimitConfig::new().with_max_requests(max_requests)),
        )
    }

    /// Plain-text answer for `GET {path}` with any query string, expected `hits` times.
    pub async fn mock_text(&mut self, path: &str, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "text/plain")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_json(&mut self, path: &str, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

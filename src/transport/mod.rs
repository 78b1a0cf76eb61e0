//! Outbound HTTP plumbing: deadline-bounded requests and the transport seam
//! the generation service talks to.

mod http;

pub use http::{HttpTransport, HttpTransportConfig};

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Status and full body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub status: u16,
    pub body: Bytes,
}

impl FetchedBody {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs GET requests on behalf of the generation service.
///
/// Implementations must give up once `timeout` has elapsed, returning
/// [`TransportError::Timeout`].
#[async_trait]
pub trait TextTransport: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
        request_id: Option<&str>,
    ) -> Result<FetchedBody, TransportError>;

    fn name(&self) -> &'static str;
}

/// Drive `request` to completion, or fail once `timeout` elapses.
///
/// On timeout the request future is dropped, which aborts the in-flight
/// exchange. The deadline timer is released on every exit path.
pub async fn fetch_with_timeout<F, T, E>(request: F, timeout: Duration) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<TransportError>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}

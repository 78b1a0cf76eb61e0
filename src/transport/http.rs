use super::{fetch_with_timeout, FetchedBody, TextTransport, TransportError};
use crate::config::parse_var;
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use url::Url;

/// Connection-pool and proxy settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
            user_agent: None,
        }
    }
}

impl HttpTransportConfig {
    /// Defaults overridden by `TEXTGEN_HTTP_*` / `TEXTGEN_PROXY_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Like [`HttpTransportConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup("TEXTGEN_HTTP_POOL_MAX_IDLE_PER_HOST") {
            config.pool_max_idle_per_host = parse_var("TEXTGEN_HTTP_POOL_MAX_IDLE_PER_HOST", &v)?;
        }
        if let Some(v) = lookup("TEXTGEN_HTTP_POOL_IDLE_TIMEOUT_SECS") {
            let secs: u64 = parse_var("TEXTGEN_HTTP_POOL_IDLE_TIMEOUT_SECS", &v)?;
            config.pool_idle_timeout = Duration::from_secs(secs);
        }
        config.proxy_url = lookup("TEXTGEN_PROXY_URL").filter(|v| !v.trim().is_empty());
        Ok(config)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// reqwest-backed [`TextTransport`].
///
/// The per-request deadline covers both the response head and the body, so a
/// server that stalls mid-body still times out.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(TransportError::Http)?;
            builder = builder.proxy(proxy);
        }
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }

        let client = builder.build().map_err(TransportError::Http)?;
        Ok(Self { client })
    }

    /// Transport with default pool settings and env overrides.
    pub fn from_env() -> Result<Self> {
        Self::new(&HttpTransportConfig::from_env()?)
    }
}

#[async_trait]
impl TextTransport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
        request_id: Option<&str>,
    ) -> std::result::Result<FetchedBody, TransportError> {
        let mut req = self.client.get(url.clone());
        if let Some(id) = request_id {
            req = req.header("x-request-id", id);
        }

        let exchange = async move {
            let resp = req.send().await?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>(FetchedBody { status, body })
        };

        fetch_with_timeout(exchange, timeout).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_pool_settings() {
        let config = HttpTransportConfig::from_env_with(lookup(&[
            ("TEXTGEN_HTTP_POOL_MAX_IDLE_PER_HOST", "4"),
            ("TEXTGEN_HTTP_POOL_IDLE_TIMEOUT_SECS", " 15 "),
        ]))
        .unwrap();
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(15));
        assert!(config.proxy_url.is_none());

        let defaults = HttpTransportConfig::from_env_with(lookup(&[])).unwrap();
        assert_eq!(defaults.pool_max_idle_per_host, 32);
        assert_eq!(defaults.pool_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_unparsable_pool_setting_is_an_error() {
        for (name, value) in [
            ("TEXTGEN_HTTP_POOL_MAX_IDLE_PER_HOST", "many"),
            ("TEXTGEN_HTTP_POOL_IDLE_TIMEOUT_SECS", "-1"),
        ] {
            let err = HttpTransportConfig::from_env_with(lookup(&[(name, value)])).unwrap_err();
            assert!(matches!(err, crate::Error::Configuration { .. }));
            assert_eq!(err.context().unwrap().field_path.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_transport_builds_with_user_agent() {
        let config = HttpTransportConfig::default().with_user_agent("RelayTest/1.0");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.name(), "http");
    }
}

//! PyPI JSON API client.

use crate::discovery::canonicalize_name;
use crate::registry::RegistryLookup;
use crate::types::{HttpConfig, LookupError, RegistryStatus, Result};
use crate::version::Version;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org/pypi/";

/// PyPI JSON API response for `/pypi/{name}/json`.
#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    /// Latest non-prerelease version, as chosen by PyPI.
    version: Option<String>,
}

/// Registry client for PyPI-compatible JSON APIs.
pub struct PypiRegistry {
    client: Client,
    rate_limiter: Arc<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
    base_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
    include_prereleases: bool,
}

impl PypiRegistry {
    /// Create a new client against `base_url` (e.g. `https://pypi.org/pypi/`).
    pub fn new(base_url: &str, http: &HttpConfig, rate_limit: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(&http.user_agent)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        // Url::join drops the last path segment unless it ends with '/'
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            rate_limiter,
            base_url,
            max_retries: http.max_retries,
            retry_backoff: Duration::from_millis(500),
            include_prereleases: false,
        })
    }

    /// Compare against the greatest published release, pre-releases included.
    pub fn with_prereleases(mut self, include: bool) -> Self {
        self.include_prereleases = include;
        self
    }

    /// Delay multiplier between retries.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn package_url(&self, canonical: &str) -> std::result::Result<Url, LookupError> {
        self.base_url
            .join(&format!("{}/json", urlencoding::encode(canonical)))
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }

    /// One request, no retries.
    async fn do_lookup(&self, url: &Url, package_name: &str) -> std::result::Result<RegistryStatus, LookupError> {
        trace!("Checking PyPI: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Package NOT FOUND on registry: {}", package_name);
                return Ok(RegistryStatus::NotPresent);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
            status if !status.is_success() => return Err(LookupError::Status(status.as_u16())),
            _ => {}
        }

        let body: PypiResponse = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

        let version = if self.include_prereleases {
            greatest_release(body.releases.keys()).or(body.info.version)
        } else {
            body.info.version
        };

        debug!("Package exists: {} ({:?})", package_name, version);
        Ok(RegistryStatus::Present { version })
    }
}

/// Highest parseable version among the release keys.
fn greatest_release<'a>(releases: impl Iterator<Item = &'a String>) -> Option<String> {
    releases
        .filter_map(|raw| Version::parse(raw).ok().map(|v| (v, raw)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
}

fn is_retryable(error: &LookupError) -> bool {
    match error {
        LookupError::Transport(_) | LookupError::RateLimited => true,
        LookupError::Status(code) => *code >= 500,
        LookupError::InvalidResponse(_) => false,
    }
}

#[async_trait]
impl RegistryLookup for PypiRegistry {
    async fn lookup(&self, package_name: &str) -> std::result::Result<RegistryStatus, LookupError> {
        let canonical = canonicalize_name(package_name);

        let url = self.package_url(&canonical)?;
        let mut attempt = 0;

        loop {
            self.rate_limiter.until_ready().await;

            match self.do_lookup(&url, package_name).await {
                Ok(status) => return Ok(status),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    debug!("Retrying {} ({}/{}): {}", package_name, attempt, self.max_retries, e);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    warn!("Failed to check package '{}' on registry: {}", package_name, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};

    fn registry(server: &ServerGuard, max_retries: u32) -> PypiRegistry {
        let http = HttpConfig {
            timeout_secs: 5,
            max_retries,
            ..HttpConfig::default()
        };
        PypiRegistry::new(&format!("{}/pypi", server.url()), &http, 100)
            .unwrap()
            .with_retry_backoff(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_lookup_present() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/requests/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"info": {"version": "2.32.3"}, "releases": {"2.31.0": [], "2.32.3": []}}"#)
            .create_async()
            .await;

        let result = registry(&server, 0).lookup("requests").await;

        mock.assert_async().await;
        assert_eq!(
            result,
            Ok(RegistryStatus::Present {
                version: Some("2.32.3".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/internal-lib/json")
            .with_status(404)
            .create_async()
            .await;

        let result = registry(&server, 0).lookup("internal-lib").await;

        mock.assert_async().await;
        assert_eq!(result, Ok(RegistryStatus::NotPresent));
    }

    #[tokio::test]
    async fn test_lookup_uses_canonical_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/my-internal-lib/json")
            .with_status(404)
            .create_async()
            .await;

        let result = registry(&server, 0).lookup("My_Internal.Lib").await;

        mock.assert_async().await;
        assert_eq!(result, Ok(RegistryStatus::NotPresent));
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_retried_then_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/flaky/json")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let result = registry(&server, 2).lookup("flaky").await;

        mock.assert_async().await;
        assert_eq!(result, Err(LookupError::Status(503)));
    }

    #[tokio::test]
    async fn test_lookup_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/broken/json")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = registry(&server, 3).lookup("broken").await;

        assert!(matches!(result, Err(LookupError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_lookup_rate_limited_is_retried_then_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/busy/json")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let result = registry(&server, 1).lookup("busy").await;

        mock.assert_async().await;
        assert_eq!(result, Err(LookupError::RateLimited));
    }

    #[tokio::test]
    async fn test_lookup_present_without_version() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/placeholder/json")
            .with_status(200)
            .with_body(r#"{"info": {"version": null}, "releases": {}}"#)
            .create_async()
            .await;

        let result = registry(&server, 0).lookup("placeholder").await;

        assert_eq!(result, Ok(RegistryStatus::Present { version: None }));
    }

    #[tokio::test]
    async fn test_lookup_with_prereleases() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/pypi/django/json")
            .with_status(200)
            .with_body(
                r#"{"info": {"version": "4.2.0"},
                    "releases": {"4.1.0": [], "4.2.0": [], "5.0a1": [], "5.0rc1": [], "bogus": []}}"#,
            )
            .create_async()
            .await;

        let result = registry(&server, 0)
            .with_prereleases(true)
            .lookup("django")
            .await;

        assert_eq!(
            result,
            Ok(RegistryStatus::Present {
                version: Some("5.0rc1".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_transport_error() {
        let http = HttpConfig {
            timeout_secs: 2,
            max_retries: 0,
            ..HttpConfig::default()
        };
        let registry = PypiRegistry::new("http://127.0.0.1:1/pypi/", &http, 10).unwrap();

        let result = registry.lookup("requests").await;

        assert!(matches!(result, Err(LookupError::Transport(_))));
    }

    #[test]
    fn test_greatest_release() {
        let releases = ["1.0".to_string(), "1.10".to_string(), "1.9".to_string()];
        assert_eq!(greatest_release(releases.iter()), Some("1.10".to_string()));
        let empty: [String; 0] = [];
        assert_eq!(greatest_release(empty.iter()), None);
    }
}

//! Rendered-page fetch capability.
//!
//! The engine drives page retrieval through the [`PageFetcher`] trait so the
//! transport stays swappable: the production [`RegistryClient`] goes over
//! reqwest, tests script responses, and a headless-browser client can slot
//! in behind the same seam.

use std::time::Duration;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection through egress failed: {0}")]
    Connection(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("invalid egress address {0}")]
    Egress(String),
}

/// Capability to load a fully rendered registry page through a given egress.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Fetch the page at `url`, routing the request through the
    /// `host:port` egress, and return its HTML.
    async fn fetch_rendered_page(&self, url: &str, egress: &str) -> Result<String, FetchError>;
}

/// Reqwest-backed fetcher for the registry aggregator.
pub struct RegistryClient {
    timeout: Duration,
}

impl RegistryClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PageFetcher for RegistryClient {
    async fn fetch_rendered_page(&self, url: &str, egress: &str) -> Result<String, FetchError> {
        let proxy = reqwest::Proxy::all(format!("http://{egress}"))
            .map_err(|e| FetchError::Egress(format!("{egress}: {e}")))?;

        // The egress changes per attempt, so the client is built per call.
        // Free proxies routinely break the TLS chain, hence the cert bypass.
        let client = reqwest::Client::builder()
            .proxy(proxy)
            .danger_accept_invalid_certs(true)
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Navigation(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, self.timeout))?;

        let status = response.status();

        // 4xx bodies carry the site's CAPTCHA/denial markup and must reach
        // the classifier; only server errors are treated as navigation
        // failures here.
        if status.is_server_error() {
            return Err(FetchError::Navigation(format!(
                "registry returned HTTP {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, self.timeout))
    }
}

fn classify_reqwest_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() {
        FetchError::Connection(error.to_string())
    } else {
        FetchError::Navigation(error.to_string())
    }
}

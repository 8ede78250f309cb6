/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use crate::http::{ImgpressError, Result};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default base URL of the image processing service
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the image processing service
#[derive(Debug, Clone)]
pub struct ImageClient {
    http_client: Client,
    base_url: Url,
}

impl ImageClient {
    /// Create a new client against the default base URL
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default(), DEFAULT_BASE_URL)
    }

    /// Create a new client with custom configuration and base URL
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Base URL all endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for an endpoint relative to the base URL
    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder for an endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%method, %url, "building request");
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `Api` errors
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let (status, body) = self.send_raw(builder).await?;
        if !status.is_success() {
            return Err(ImgpressError::from_response(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request and return status plus raw body text
    pub(crate) async fn send_raw(
        &self,
        builder: RequestBuilder,
    ) -> Result<(reqwest::StatusCode, String)> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok((status, body))
    }
}

/// Ensure the base URL ends with a slash so relative joins keep its path
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ImgpressError::Config("base URL must not be empty".to_string()));
    }

    let mut url = Url::parse(trimmed)?;
    if url.cannot_be_a_base() {
        return Err(ImgpressError::Config(format!(
            "base URL cannot carry paths: {trimmed}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

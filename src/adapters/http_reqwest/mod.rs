//! Blocking HTTP stream adapter built on `reqwest::blocking`
//!
//! Every request carries the configured client identity and referrer. No
//! overall timeout is set; only the transport's own limits apply.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

pub struct ReqwestStreamAdapter {
    client: Client,
}

impl ReqwestStreamAdapter {
    /// Build the client. Must not be called from inside an async runtime.
    pub fn new(user_agent: &str, referer: &str) -> DomainResult<Self> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(referer)
            .map_err(|e| DomainError::Config(format!("invalid referer '{}': {}", referer, e)))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(None)
            .build()
            .map_err(|e| DomainError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl StreamPort for ReqwestStreamAdapter {
    fn open(&self, url: &str) -> DomainResult<RemoteStream> {
        debug!(url, "opening stream");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DomainError::Network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Network(format!(
                "server answered {} for {}",
                status, url
            )));
        }

        let content_length = response.content_length();
        debug!(url, ?content_length, "stream opened");
        Ok(RemoteStream {
            content_length,
            body: Box::new(response),
        })
    }
}

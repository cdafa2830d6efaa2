//! Metadata resolver over HTTP
//!
//! Asks `GET {resolver_url}/{identifier}` for a JSON manifest with the
//! title, content id and track URLs of a remote video.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

#[derive(Debug, Clone)]
pub struct HttpMetadataAdapter {
    client: reqwest::Client,
    resolver_url: String,
}

impl HttpMetadataAdapter {
    pub fn new(resolver_url: &str, user_agent: &str) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            // Each task drives its own short-lived runtime; pooled
            // connections would outlive the runtime that opened them
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| DomainError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            resolver_url: resolver_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, id: &MediaIdentifier) -> String {
        format!("{}/{}", self.resolver_url, id)
    }
}

#[async_trait]
impl MetadataPort for HttpMetadataAdapter {
    async fn resolve(&self, id: &MediaIdentifier) -> DomainResult<VideoManifest> {
        let url = self.endpoint(id);
        debug!(%url, "resolving identifier");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Metadata(format!("HTTP request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(DomainError::Metadata(format!("unknown identifier {}", id)));
            }
            status if !status.is_success() => {
                return Err(DomainError::Metadata(format!(
                    "resolver answered {} for {}",
                    status, id
                )));
            }
            _ => {}
        }

        let manifest: VideoManifest = response
            .json()
            .await
            .map_err(|e| DomainError::Metadata(format!("JSON parsing failed: {}", e)))?;

        ensure_playable(id, manifest)
    }
}

/// Reject manifests that list no track at all.
pub fn ensure_playable(id: &MediaIdentifier, manifest: VideoManifest) -> DomainResult<VideoManifest> {
    if manifest.audio_urls.is_empty() && manifest.video_urls.is_empty() {
        return Err(DomainError::Metadata(format!("no tracks listed for {}", id)));
    }
    info!(
        %id,
        title = %manifest.title,
        audio = manifest.audio_urls.len(),
        video = manifest.video_urls.len(),
        "identifier resolved"
    );
    Ok(manifest)
}

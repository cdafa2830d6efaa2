//! Metadata from local manifest files
//!
//! Looks up `{identifier}.json`, `{identifier}.yaml` or `{identifier}.yml`
//! in a directory. Useful offline and for pre-resolved links.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::metadata_http::ensure_playable;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

#[derive(Debug, Clone)]
pub struct ManifestDirAdapter {
    dir: PathBuf,
}

impl ManifestDirAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, id: &MediaIdentifier) -> Vec<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", id, ext)))
            .collect()
    }
}

fn parse_manifest(path: &Path, content: &str) -> DomainResult<VideoManifest> {
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    if is_json {
        serde_json::from_str(content)
            .map_err(|e| DomainError::Metadata(format!("invalid manifest {}: {}", path.display(), e)))
    } else {
        serde_yaml::from_str(content)
            .map_err(|e| DomainError::Metadata(format!("invalid manifest {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl MetadataPort for ManifestDirAdapter {
    async fn resolve(&self, id: &MediaIdentifier) -> DomainResult<VideoManifest> {
        for path in self.candidates(id) {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    debug!(path = %path.display(), "manifest found");
                    return ensure_playable(id, parse_manifest(&path, &content)?);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(DomainError::io(path.display(), e)),
            }
        }
        Err(DomainError::Metadata(format!(
            "unknown identifier {} (no manifest in {})",
            id,
            self.dir.display()
        )))
    }
}

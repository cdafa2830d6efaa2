// TOML config adapter - Configuration management using TOML files

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::tracing_log::LogLevel;
use crate::domain::errors::*;
use crate::utils::path::default_downloads_dir;

/// Default name of the config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "streamcut.toml";

/// Backend used to probe local media files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// `ffprobe` executable
    Ffprobe,
    /// In-process libav bindings (needs the `libav` feature)
    Libav,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where fetched files land; next to the executable when unset
    pub downloads_dir: Option<PathBuf>,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub probe_backend: ProbeBackend,
    /// Base URL of the metadata resolver
    pub resolver_url: Option<String>,
    /// Directory of pre-resolved manifests; wins over `resolver_url`
    pub manifest_dir: Option<PathBuf>,
    pub user_agent: String,
    pub referer: String,
    /// Bytes per read while streaming
    pub chunk_size: usize,
    pub mp3_bitrate_kbps: u32,
    pub log_level: String,
    /// Batch jobs in flight at once
    pub max_parallel: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            downloads_dir: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            probe_backend: ProbeBackend::Ffprobe,
            resolver_url: None,
            manifest_dir: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            referer: "https://www.bilibili.com".to_string(),
            chunk_size: 64 * 1024,
            mp3_bitrate_kbps: 192,
            log_level: "info".to_string(),
            max_parallel: num_cpus::get().max(1),
        }
    }
}

impl AppConfig {
    /// Reject values no task could run with.
    pub fn validate(&self) -> DomainResult<()> {
        if self.chunk_size == 0 {
            return Err(DomainError::Config("chunk_size must be greater than zero".to_string()));
        }
        if !(32..=320).contains(&self.mp3_bitrate_kbps) {
            return Err(DomainError::Config(format!(
                "mp3_bitrate_kbps must be between 32 and 320, got {}",
                self.mp3_bitrate_kbps
            )));
        }
        if self.max_parallel == 0 {
            return Err(DomainError::Config("max_parallel must be at least 1".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(DomainError::Config("user_agent must not be empty".to_string()));
        }
        LogLevel::parse(&self.log_level)?;
        Ok(())
    }

    /// Downloads directory with the executable-relative default applied
    pub fn resolved_downloads_dir(&self) -> DomainResult<PathBuf> {
        match &self.downloads_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_downloads_dir(),
        }
    }

    pub fn log_level(&self) -> DomainResult<LogLevel> {
        LogLevel::parse(&self.log_level)
    }
}

/// On-disk layout: everything lives under a `[streamcut]` table
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    streamcut: AppConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse a config document
    pub fn parse(content: &str) -> DomainResult<AppConfig> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("failed to parse TOML config: {}", e)))?;
        Ok(file.streamcut)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> DomainResult<AppConfig> {
        debug!(path = %path.display(), "reading config file");
        let content = std::fs::read_to_string(path).map_err(|e| DomainError::io(path.display(), e))?;
        Self::parse(&content)
            .map_err(|e| DomainError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Serialize config to TOML string
    pub fn to_toml(config: &AppConfig) -> DomainResult<String> {
        let file = ConfigFile {
            streamcut: config.clone(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| DomainError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Write the config atomically; an existing file is replaced whole.
    pub fn save(config: &AppConfig, path: &Path) -> DomainResult<()> {
        let content = Self::to_toml(config)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| DomainError::io(dir.display(), e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| DomainError::io(dir.display(), e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| DomainError::io(tmp.path().display(), e))?;
        tmp.persist(path)
            .map_err(|e| DomainError::io(path.display(), e.error))?;

        info!(path = %path.display(), "config written");
        Ok(())
    }
}

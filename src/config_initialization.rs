//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI flags > `STREAMCUT_*` environment > config file > defaults.
//! clap folds the environment into the flag values, so only two layers are
//! merged here.

use std::path::{Path, PathBuf};

use crate::adapters::toml_config::{AppConfig, ProbeBackend, TomlConfigAdapter, DEFAULT_CONFIG_FILE};
use crate::cli::args::GlobalArgs;
use crate::domain::errors::*;

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub downloads_dir: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub probe_backend: Option<ProbeBackend>,
    pub resolver_url: Option<String>,
    pub manifest_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub chunk_size: Option<usize>,
    pub mp3_bitrate_kbps: Option<u32>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self {
            downloads_dir: args.downloads_dir.clone(),
            ffmpeg_path: args.ffmpeg.clone(),
            ffprobe_path: args.ffprobe.clone(),
            probe_backend: args.probe_backend,
            resolver_url: args.resolver_url.clone(),
            manifest_dir: args.manifest_dir.clone(),
            user_agent: args.user_agent.clone(),
            referer: args.referer.clone(),
            chunk_size: args.chunk_size,
            mp3_bitrate_kbps: args.mp3_bitrate,
            log_level: args.log_level.clone(),
        }
    }

    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.downloads_dir {
            config.downloads_dir = Some(dir);
        }
        if let Some(path) = self.ffmpeg_path {
            config.ffmpeg_path = path;
        }
        if let Some(path) = self.ffprobe_path {
            config.ffprobe_path = path;
        }
        if let Some(backend) = self.probe_backend {
            config.probe_backend = backend;
        }
        if let Some(url) = self.resolver_url {
            config.resolver_url = Some(url);
        }
        if let Some(dir) = self.manifest_dir {
            config.manifest_dir = Some(dir);
        }
        if let Some(agent) = self.user_agent {
            config.user_agent = agent;
        }
        if let Some(referer) = self.referer {
            config.referer = referer;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(kbps) = self.mp3_bitrate_kbps {
            config.mp3_bitrate_kbps = kbps;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
    }
}

/// Effective configuration and the file it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

/// Build the effective configuration.
///
/// An explicit config path must exist; the default file is optional.
/// Runs before logging is set up, so nothing is logged here.
pub fn initialize_configuration(
    explicit: Option<&Path>,
    working_dir: &Path,
    overrides: ConfigOverrides,
) -> DomainResult<LoadedConfig> {
    let source = locate_config_file(explicit, working_dir)?;
    let mut config = match &source {
        Some(path) => TomlConfigAdapter::load(path)?,
        None => AppConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(LoadedConfig { config, source })
}

fn locate_config_file(explicit: Option<&Path>, working_dir: &Path) -> DomainResult<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(DomainError::Config(format!(
            "config file not found: {}",
            path.display()
        ))),
        None => {
            let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
            Ok(candidate.is_file().then_some(candidate))
        }
    }
}

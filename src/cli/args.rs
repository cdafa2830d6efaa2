//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::domain::model::FetchMode;
use crate::domain::rules::{ClipIntent, ConcatIntent, FormatAnswer};

fn parse_bitrate(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 32, 320)
}

fn parse_parallel(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, 256)
}

fn parse_chunk_size(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, 16 * 1024 * 1024)
}

/// Options every command accepts; each one can also come from the
/// environment and overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./streamcut.toml when present)
    #[arg(long, global = true, env = "STREAMCUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "STREAMCUT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STREAMCUT_LOG_JSON")]
    pub log_json: bool,

    /// Where fetched files are written
    #[arg(long, global = true, env = "STREAMCUT_DOWNLOADS_DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true, env = "STREAMCUT_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, global = true, env = "STREAMCUT_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// How local files are probed
    #[arg(long, global = true, value_enum, env = "STREAMCUT_PROBE_BACKEND")]
    pub probe_backend: Option<crate::adapters::ProbeBackend>,

    /// Base URL of the metadata resolver
    #[arg(long, global = true, env = "STREAMCUT_RESOLVER_URL")]
    pub resolver_url: Option<String>,

    /// Directory of `{id}.json|yaml` manifests (wins over --resolver-url)
    #[arg(long, global = true, env = "STREAMCUT_MANIFEST_DIR")]
    pub manifest_dir: Option<PathBuf>,

    /// User-Agent sent with every stream request
    #[arg(long, global = true, env = "STREAMCUT_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Referer sent with every stream request
    #[arg(long, global = true, env = "STREAMCUT_REFERER")]
    pub referer: Option<String>,

    /// Bytes per network read
    #[arg(long, global = true, env = "STREAMCUT_CHUNK_SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<usize>,

    /// MP3 bitrate in kbps (32-320)
    #[arg(long, global = true, env = "STREAMCUT_MP3_BITRATE", value_parser = parse_bitrate)]
    pub mp3_bitrate: Option<u32>,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media file to inspect
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchModeArg {
    /// Audio converted to MP3
    Mp3,
    /// Audio as AAC in MP4
    Mp4Audio,
    /// Video track only
    Mp4,
    /// Video and audio merged
    Full,
}

impl From<FetchModeArg> for FetchMode {
    fn from(arg: FetchModeArg) -> Self {
        match arg {
            FetchModeArg::Mp3 => FetchMode::Mp3,
            FetchModeArg::Mp4Audio => FetchMode::Mp4Audio,
            FetchModeArg::Mp4 => FetchMode::Mp4,
            FetchModeArg::Full => FetchMode::Full,
        }
    }
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Links carrying a BV identifier; each becomes its own task
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// What to retrieve
    #[arg(short, long, value_enum, default_value = "full")]
    pub mode: FetchModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipFormatArg {
    Mp3,
    Mp4Audio,
    VideoOnly,
    WithAudio,
}

impl ClipFormatArg {
    pub fn intent(&self) -> ClipIntent {
        match self {
            ClipFormatArg::Mp3 | ClipFormatArg::Mp4Audio => ClipIntent::Audio,
            ClipFormatArg::VideoOnly | ClipFormatArg::WithAudio => ClipIntent::Video,
        }
    }
}

impl From<ClipFormatArg> for FormatAnswer {
    fn from(arg: ClipFormatArg) -> Self {
        match arg {
            ClipFormatArg::Mp3 => FormatAnswer::Mp3,
            ClipFormatArg::Mp4Audio => FormatAnswer::Mp4Audio,
            ClipFormatArg::VideoOnly => FormatAnswer::VideoOnly,
            ClipFormatArg::WithAudio => FormatAnswer::VideoWithAudio,
        }
    }
}

/// Arguments for the clip command
#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Source file
    pub input: PathBuf,

    /// Start time (SS, MM:SS or HH:MM:SS)
    #[arg(short, long, default_value = "0")]
    pub start: String,

    /// End time (default: end of the source)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Keep only the sound
    #[arg(long)]
    pub audio: bool,

    /// Answer the format question up front
    #[arg(short, long, value_enum)]
    pub format: Option<ClipFormatArg>,
}

impl ClipArgs {
    pub fn intent(&self) -> ClipIntent {
        clip_intent(self.audio, self.format)
    }
}

/// A format flag implies its intent; otherwise `--audio` decides.
pub fn clip_intent(audio: bool, format: Option<ClipFormatArg>) -> ClipIntent {
    match format {
        Some(format) => format.intent(),
        None if audio => ClipIntent::Audio,
        None => ClipIntent::Video,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcatModeArg {
    Video,
    VideoOnly,
    /// Audio only; the container is asked for
    Audio,
    AudioMp3,
    AudioMp4,
}

impl ConcatModeArg {
    pub fn intent(&self) -> ConcatIntent {
        match self {
            ConcatModeArg::Video => ConcatIntent::Video,
            ConcatModeArg::VideoOnly => ConcatIntent::VideoOnly,
            ConcatModeArg::Audio | ConcatModeArg::AudioMp3 | ConcatModeArg::AudioMp4 => {
                ConcatIntent::Audio
            }
        }
    }

    /// Container answer carried by the mode itself
    pub fn preset(&self) -> Option<FormatAnswer> {
        match self {
            ConcatModeArg::AudioMp3 => Some(FormatAnswer::Mp3),
            ConcatModeArg::AudioMp4 => Some(FormatAnswer::Mp4Audio),
            _ => None,
        }
    }
}

/// Arguments for the concat command
#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// First input; always played first
    pub first: PathBuf,

    /// Second input
    pub second: PathBuf,

    #[arg(long, default_value = "0")]
    pub first_start: String,

    #[arg(long)]
    pub first_end: String,

    #[arg(long, default_value = "0")]
    pub second_start: String,

    #[arg(long)]
    pub second_end: String,

    #[arg(short, long, value_enum, default_value = "video")]
    pub mode: ConcatModeArg,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Job file (.toml, .yaml or .yml)
    pub file: PathBuf,

    /// Jobs running at once (default: file value, then config)
    #[arg(long, value_parser = parse_parallel, env = "STREAMCUT_MAX_PARALLEL")]
    pub max_parallel: Option<usize>,
}

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// List what would be removed without removing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Destination (default: ./streamcut.toml)
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

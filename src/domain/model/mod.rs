// Domain models - Core data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;

#[cfg(test)]
mod tests;

/// Marker that precedes a remote video identifier inside a link
pub const IDENTIFIER_PREFIX: &str = "BV";

/// Number of characters following the prefix
pub const IDENTIFIER_BODY_LEN: usize = 10;

/// Remote video identifier extracted from a user-supplied link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaIdentifier(String);

impl MediaIdentifier {
    /// Extract the identifier from a link.
    ///
    /// The first `BV` occurrence is taken, together with the ten characters
    /// that follow it. Those characters must be ASCII alphanumerics.
    pub fn from_url(url: &str) -> DomainResult<Self> {
        let start = url.find(IDENTIFIER_PREFIX).ok_or_else(|| {
            DomainError::InvalidIdentifier(format!("no {} id found in link: {}", IDENTIFIER_PREFIX, url))
        })?;

        let body: String = url[start + IDENTIFIER_PREFIX.len()..]
            .chars()
            .take(IDENTIFIER_BODY_LEN)
            .collect();

        if body.len() != IDENTIFIER_BODY_LEN || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidIdentifier(format!(
                "malformed id '{}{}' in link: {}",
                IDENTIFIER_PREFIX, body, url
            )));
        }

        Ok(Self(format!("{}{}", IDENTIFIER_PREFIX, body)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the prober could confirm about a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub has_video: bool,
    pub has_audio: bool,
    pub duration_seconds: u32,
    /// Frame size of the first video track, when one was opened
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StreamDescriptor {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Whole-second interval `[start, end)` within a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start_seconds: u32,
    end_seconds: u32,
}

impl TimeRange {
    /// Create a range, rejecting `start >= end`.
    pub fn new(start_seconds: u32, end_seconds: u32) -> DomainResult<Self> {
        if start_seconds >= end_seconds {
            return Err(DomainError::InvalidTimeRange(format!(
                "start ({}) must be before end ({})",
                format_clock(start_seconds),
                format_clock(end_seconds)
            )));
        }
        Ok(Self {
            start_seconds,
            end_seconds,
        })
    }

    pub fn start(&self) -> u32 {
        self.start_seconds
    }

    pub fn end(&self) -> u32 {
        self.end_seconds
    }

    pub fn length(&self) -> u32 {
        self.end_seconds - self.start_seconds
    }

    /// Check the range against a known source duration.
    pub fn ensure_within(&self, duration_seconds: u32) -> DomainResult<()> {
        if self.end_seconds > duration_seconds {
            return Err(DomainError::InvalidTimeRange(format!(
                "end ({}) is past the source duration ({})",
                format_clock(self.end_seconds),
                format_clock(duration_seconds)
            )));
        }
        Ok(())
    }

    /// `HH-mm-ss_HH-mm-ss`, as embedded in output file names
    pub fn label(&self) -> String {
        format!(
            "{}_{}",
            format_dashed(self.start_seconds),
            format_dashed(self.end_seconds)
        )
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_clock(self.start_seconds),
            format_clock(self.end_seconds)
        )
    }
}

/// Zero-padded `HH-mm-ss`
pub fn format_dashed(seconds: u32) -> String {
    format!(
        "{:02}-{:02}-{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Zero-padded `HH:MM:SS`
pub fn format_clock(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Container for audio-only output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioContainer {
    /// Re-encoded to MP3 at the configured bitrate
    Mp3,
    /// AAC in an MP4 container
    Mp4Audio,
}

impl AudioContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioContainer::Mp3 => "mp3",
            AudioContainer::Mp4Audio => "mp4",
        }
    }
}

/// What a clip should keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipTarget {
    Audio(AudioContainer),
    Video { strip_audio: bool },
}

impl ClipTarget {
    pub fn wants_video(&self) -> bool {
        matches!(self, ClipTarget::Video { .. })
    }
}

/// Which remote tracks a fetch retrieves and how they are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// Audio track converted to `{title}.mp3`
    Mp3,
    /// Audio track repackaged as `{title}_audio.mp4`
    Mp4Audio,
    /// Video track written straight to `{title}.mp4`
    Mp4,
    /// Video and audio tracks merged into `{title}.mp4`
    Full,
}

impl FetchMode {
    pub fn needs_audio(&self) -> bool {
        !matches!(self, FetchMode::Mp4)
    }

    pub fn needs_video(&self) -> bool {
        matches!(self, FetchMode::Mp4 | FetchMode::Full)
    }
}

/// Concatenation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcatMode {
    /// Video with its audio retained
    Video,
    /// Video with audio stripped from both inputs
    VideoOnly,
    /// Audio tracks only
    Audio(AudioContainer),
}

impl ConcatMode {
    pub fn is_video(&self) -> bool {
        !matches!(self, ConcatMode::Audio(_))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ConcatMode::Video | ConcatMode::VideoOnly => "mp4",
            ConcatMode::Audio(container) => container.extension(),
        }
    }
}

/// Request for the fetch unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub mode: FetchMode,
}

/// Request for the clip unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub range: TimeRange,
    pub target: ClipTarget,
}

/// Request for the concat unit; inputs are joined strictly first then second
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatRequest {
    pub first: PathBuf,
    pub first_range: TimeRange,
    pub second: PathBuf,
    pub second_range: TimeRange,
    pub mode: ConcatMode,
}

/// Kind of background unit, used for bookkeeping and messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Fetch,
    Clip,
    Concat,
}

impl TaskKind {
    /// Word used at the front of terminal messages
    pub fn verb(&self) -> &'static str {
        match self {
            TaskKind::Fetch => "Download",
            TaskKind::Clip => "Clip",
            TaskKind::Concat => "Concat",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Fetch => f.write_str("fetch"),
            TaskKind::Clip => f.write_str("clip"),
            TaskKind::Concat => f.write_str("concat"),
        }
    }
}

/// A fully decided unit of work, ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSpec {
    Fetch(FetchRequest),
    Clip(ClipRequest),
    Concat(ConcatRequest),
}

impl TaskSpec {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskSpec::Fetch(_) => TaskKind::Fetch,
            TaskSpec::Clip(_) => TaskKind::Clip,
            TaskSpec::Concat(_) => TaskKind::Concat,
        }
    }

    /// Short human description for status lines
    pub fn describe(&self) -> String {
        match self {
            TaskSpec::Fetch(req) => format!("{:?} from {}", req.mode, req.url),
            TaskSpec::Clip(req) => format!("{} [{}]", display_name(&req.source), req.range),
            TaskSpec::Concat(req) => format!(
                "{} [{}] + {} [{}]",
                display_name(&req.first),
                req.first_range,
                display_name(&req.second),
                req.second_range
            ),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Answer from the metadata service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoManifest {
    pub title: String,
    /// Internal content id; part of temp file names
    pub content_id: String,
    #[serde(default)]
    pub audio_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
}

impl VideoManifest {
    pub fn first_audio(&self) -> DomainResult<&str> {
        self.audio_urls
            .first()
            .map(String::as_str)
            .ok_or_else(|| DomainError::Metadata(format!("no audio track listed for '{}'", self.title)))
    }

    pub fn first_video(&self) -> DomainResult<&str> {
        self.video_urls
            .first()
            .map(String::as_str)
            .ok_or_else(|| DomainError::Metadata(format!("no video track listed for '{}'", self.title)))
    }
}

/// Phases of a fetch, reported as status lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Created,
    Resolving,
    Streaming { index: u8, of: u8 },
    Merging,
    Converting,
    Done,
    Failed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Created => f.write_str("created"),
            FetchPhase::Resolving => f.write_str("resolving"),
            FetchPhase::Streaming { index, of } => write!(f, "streaming {}/{}", index, of),
            FetchPhase::Merging => f.write_str("merging"),
            FetchPhase::Converting => f.write_str("converting"),
            FetchPhase::Done => f.write_str("done"),
            FetchPhase::Failed => f.write_str("failed"),
        }
    }
}

/// Terminal result of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(PathBuf),
    Failed(DomainError),
    /// Stopped by a forced shutdown; never shown to observers
    Aborted,
}

impl Outcome {
    pub fn from_result(result: DomainResult<PathBuf>) -> Self {
        match result {
            Ok(path) => Outcome::Completed(path),
            Err(DomainError::Aborted) => Outcome::Aborted,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// The single human-readable line reported for this outcome.
    pub fn message(&self, kind: TaskKind) -> Option<String> {
        match self {
            Outcome::Completed(path) => {
                Some(format!("{} complete: {}", kind.verb(), path.display()))
            }
            Outcome::Failed(DomainError::MergeFailed(reason)) => {
                Some(format!("Merge failed: {}", reason))
            }
            Outcome::Failed(err) => Some(format!("{} failed: {}", kind.verb(), err)),
            Outcome::Aborted => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

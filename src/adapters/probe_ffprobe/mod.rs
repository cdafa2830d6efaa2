//! FFprobe adapter for media file probing
//!
//! Runs the `ffprobe` executable with JSON output and reads the stream list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    format_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
}

impl FfprobeStream {
    fn is_kind(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }

    /// Cover art in audio files shows up as a one-frame video stream
    fn is_attached_picture(&self) -> bool {
        self.disposition.get("attached_pic").copied().unwrap_or(0) == 1
    }
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

impl FfprobeOutput {
    fn format_duration(&self) -> Option<f64> {
        self.format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_seconds)
    }

    fn audio(&self) -> DomainResult<AudioProbe> {
        let stream = self
            .streams
            .iter()
            .find(|s| s.is_kind("audio"))
            .ok_or_else(|| DomainError::Media("no audio stream found".to_string()))?;
        Ok(AudioProbe {
            duration_seconds: stream
                .duration
                .as_deref()
                .and_then(parse_seconds)
                .or_else(|| self.format_duration()),
        })
    }

    fn video(&self) -> DomainResult<VideoProbe> {
        let stream = self
            .streams
            .iter()
            .filter(|s| s.is_kind("video") && !s.is_attached_picture())
            .find(|s| s.width.unwrap_or(0) > 0 && s.height.unwrap_or(0) > 0)
            .ok_or_else(|| DomainError::Media("no video stream with a visible frame".to_string()))?;
        Ok(VideoProbe {
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            duration_seconds: stream
                .duration
                .as_deref()
                .and_then(parse_seconds)
                .or_else(|| self.format_duration()),
            has_embedded_audio: self.streams.iter().any(|s| s.is_kind("audio")),
        })
    }
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

fn parse_output(json: &[u8]) -> DomainResult<FfprobeOutput> {
    serde_json::from_slice(json)
        .map_err(|e| DomainError::Media(format!("failed to parse ffprobe output: {}", e)))
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    ffprobe: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    fn inspect(&self, path: &Path) -> DomainResult<FfprobeOutput> {
        debug!(path = %path.display(), ffprobe = %self.ffprobe.display(), "running ffprobe");
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| DomainError::Media(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::Media(format!("ffprobe failed: {}", stderr.trim())));
        }

        let parsed = parse_output(&output.stdout)?;
        if let Some(format) = parsed.format.as_ref().and_then(|f| f.format_name.as_deref()) {
            debug!(path = %path.display(), format, streams = parsed.streams.len(), "probed");
        }
        Ok(parsed)
    }
}

impl ProbePort for FfprobeAdapter {
    fn open_audio(&self, path: &Path) -> DomainResult<AudioProbe> {
        self.inspect(path)?.audio()
    }

    fn open_video(&self, path: &Path) -> DomainResult<VideoProbe> {
        self.inspect(path)?.video()
    }
}

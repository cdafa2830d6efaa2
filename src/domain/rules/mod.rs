// Domain rules - Business logic and policies

use std::path::{Path, PathBuf};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Encoding route chosen for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipRoute {
    /// Keep the picture; MP4 output with H.264 video
    Video { strip_audio: bool },
    /// Keep only the sound in the given container
    Audio(AudioContainer),
}

impl ClipRoute {
    pub fn extension(&self) -> &'static str {
        match self {
            ClipRoute::Video { .. } => "mp4",
            ClipRoute::Audio(container) => container.extension(),
        }
    }
}

/// Business rules for clip route selection
pub struct ClipPlanner;

impl ClipPlanner {
    /// Decide how a clip is produced from a probed source.
    pub fn plan(source: &Path, descriptor: &StreamDescriptor, target: ClipTarget) -> DomainResult<ClipRoute> {
        match target {
            ClipTarget::Audio(_) if !descriptor.has_audio => Err(DomainError::MissingTrack(
                format!("{} has no audio track", source.display()),
            )),
            ClipTarget::Video { strip_audio } if is_mp4(source) && descriptor.has_video => {
                Ok(ClipRoute::Video {
                    strip_audio: strip_audio || !descriptor.has_audio,
                })
            }
            ClipTarget::Video { .. } if !descriptor.has_audio => Err(DomainError::MissingTrack(
                format!("{} has neither a usable video nor audio track", source.display()),
            )),
            // Video asked of an MP3 or audio-only source degrades to an MP3 clip
            ClipTarget::Video { .. } => Ok(ClipRoute::Audio(AudioContainer::Mp3)),
            ClipTarget::Audio(container) => Ok(ClipRoute::Audio(container)),
        }
    }
}

/// What the user asked a clip to keep, before any format decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipIntent {
    Audio,
    Video,
}

/// What the user asked a concatenation to produce, before any format decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatIntent {
    Video,
    VideoOnly,
    Audio,
}

/// A format decision that must be made before a task is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatQuestion {
    /// MP3 or MP4-audio
    AudioContainer,
    /// Video-only or video with its audio
    KeepAudio,
}

impl FormatQuestion {
    pub fn prompt(&self) -> &'static str {
        match self {
            FormatQuestion::AudioContainer => "Choose the audio output format",
            FormatQuestion::KeepAudio => "Choose the video output format",
        }
    }

    pub fn options(&self) -> [FormatAnswer; 2] {
        match self {
            FormatQuestion::AudioContainer => [FormatAnswer::Mp3, FormatAnswer::Mp4Audio],
            FormatQuestion::KeepAudio => [FormatAnswer::VideoOnly, FormatAnswer::VideoWithAudio],
        }
    }

    pub fn accepts(&self, answer: FormatAnswer) -> bool {
        self.options().contains(&answer)
    }
}

/// An answer to a `FormatQuestion`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatAnswer {
    Mp3,
    Mp4Audio,
    VideoOnly,
    VideoWithAudio,
}

impl FormatAnswer {
    pub fn label(&self) -> &'static str {
        match self {
            FormatAnswer::Mp3 => "MP3",
            FormatAnswer::Mp4Audio => "MP4 (audio)",
            FormatAnswer::VideoOnly => "MP4 (video only)",
            FormatAnswer::VideoWithAudio => "MP4 (video and audio)",
        }
    }

    pub fn audio_container(&self) -> Option<AudioContainer> {
        match self {
            FormatAnswer::Mp3 => Some(AudioContainer::Mp3),
            FormatAnswer::Mp4Audio => Some(AudioContainer::Mp4Audio),
            _ => None,
        }
    }
}

/// Rules deciding when a format question has to be asked
pub struct FormatPolicy;

impl FormatPolicy {
    /// Question needed for a clip, if any.
    ///
    /// Fails early when an audio clip is asked of an MP4 with no audio.
    pub fn clip_question(
        source: &Path,
        descriptor: &StreamDescriptor,
        intent: ClipIntent,
    ) -> DomainResult<Option<FormatQuestion>> {
        if !is_mp4(source) {
            return Ok(None);
        }
        match intent {
            ClipIntent::Audio if descriptor.has_audio => Ok(Some(FormatQuestion::AudioContainer)),
            ClipIntent::Audio => Err(DomainError::MissingTrack(format!(
                "the selected MP4 has no audio track: {}",
                source.display()
            ))),
            ClipIntent::Video if descriptor.has_video && descriptor.has_audio => {
                Ok(Some(FormatQuestion::KeepAudio))
            }
            ClipIntent::Video => Ok(None),
        }
    }

    /// Audio concatenation always needs its container chosen.
    pub fn concat_question(intent: ConcatIntent) -> Option<FormatQuestion> {
        match intent {
            ConcatIntent::Audio => Some(FormatQuestion::AudioContainer),
            ConcatIntent::Video | ConcatIntent::VideoOnly => None,
        }
    }

    pub fn concat_mode(intent: ConcatIntent, answer: Option<FormatAnswer>) -> ConcatMode {
        match intent {
            ConcatIntent::Video => ConcatMode::Video,
            ConcatIntent::VideoOnly => ConcatMode::VideoOnly,
            ConcatIntent::Audio => ConcatMode::Audio(
                answer
                    .and_then(|a| a.audio_container())
                    .unwrap_or(AudioContainer::Mp3),
            ),
        }
    }

    /// Turn an intent plus an optional answer into a clip target.
    pub fn clip_target(
        intent: ClipIntent,
        descriptor: &StreamDescriptor,
        answer: Option<FormatAnswer>,
    ) -> ClipTarget {
        match (intent, answer) {
            (ClipIntent::Audio, Some(FormatAnswer::Mp4Audio)) => {
                ClipTarget::Audio(AudioContainer::Mp4Audio)
            }
            (ClipIntent::Audio, _) => ClipTarget::Audio(AudioContainer::Mp3),
            (ClipIntent::Video, Some(FormatAnswer::VideoOnly)) => {
                ClipTarget::Video { strip_audio: true }
            }
            (ClipIntent::Video, Some(FormatAnswer::VideoWithAudio)) => {
                ClipTarget::Video { strip_audio: false }
            }
            (ClipIntent::Video, _) => ClipTarget::Video {
                strip_audio: !descriptor.has_audio,
            },
        }
    }
}

/// Precondition on the two inputs of a concatenation
pub struct ConcatPolicy;

impl ConcatPolicy {
    pub fn check(mode: ConcatMode, first: &StreamDescriptor, second: &StreamDescriptor) -> DomainResult<()> {
        if mode.is_video() {
            if !(first.has_video && second.has_video) {
                return Err(DomainError::MissingTrack(
                    "video concatenation needs two MP4 files that both contain video".to_string(),
                ));
            }
        } else if !(first.has_audio && second.has_audio) {
            return Err(DomainError::MissingTrack(
                "audio concatenation needs two files that both contain audio".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which fetched track a temporary file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFile {
    Audio,
    Video,
}

/// Output and temporary file naming
pub struct OutputNaming;

impl OutputNaming {
    /// Final file name for a fetch, before joining with the downloads dir
    pub fn fetch_output(title: &str, mode: FetchMode) -> String {
        let title = sanitize_title(title);
        match mode {
            FetchMode::Mp3 => format!("{}.mp3", title),
            FetchMode::Mp4Audio => format!("{}_audio.mp4", title),
            FetchMode::Mp4 | FetchMode::Full => format!("{}.mp4", title),
        }
    }

    /// Intermediate name; keyed by identifier and content id so concurrent
    /// fetches of different sources never share a file.
    pub fn temp_track(track: TrackFile, id: &MediaIdentifier, content_id: &str) -> String {
        let content_id = sanitize_title(content_id);
        match track {
            TrackFile::Audio => format!("temp_audio_{}_{}.m4a", id, content_id),
            TrackFile::Video => format!("temp_video_{}_{}.mp4", id, content_id),
        }
    }

    /// `{base}_clip_{HH-mm-ss}_{HH-mm-ss}.{ext}` beside the source
    pub fn clip_output(source: &Path, range: &TimeRange, extension: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        let name = format!("{}_clip_{}.{}", stem, range.label(), extension);
        match source.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// `concat_{start1}_{end2}.{ext}` in the directory of the first input
    pub fn concat_output(first: &Path, first_range: &TimeRange, second_range: &TimeRange, mode: ConcatMode) -> PathBuf {
        let name = format!(
            "concat_{}_{}.{}",
            format_dashed(first_range.start()),
            format_dashed(second_range.end()),
            mode.extension()
        );
        match first.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Characters that cannot appear in file names on common platforms
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a remote title usable as a file name.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if INVALID_NAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches('.').trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extension check used by the clip and format rules
pub fn is_mp4(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests;

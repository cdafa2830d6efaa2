// Ports - Interface definitions (contracts)

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{FormatAnswer, FormatQuestion};
use crate::engine::{ShutdownChoice, TaskContext};

/// What opening a file as audio confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct AudioProbe {
    pub duration_seconds: Option<f64>,
}

/// What opening a file as video confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: Option<f64>,
    /// The container also carries an audio track
    pub has_embedded_audio: bool,
}

/// Port for media file probing
///
/// The two calls are independent attempts; either may fail without
/// saying anything about the other.
pub trait ProbePort: Send + Sync {
    /// Open the file as an audio stream
    fn open_audio(&self, path: &Path) -> DomainResult<AudioProbe>;

    /// Open the file as a video stream with a non-empty frame
    fn open_video(&self, path: &Path) -> DomainResult<VideoProbe>;
}

/// One input of a render job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInput {
    pub path: PathBuf,
    /// Sub-range to read; `None` reads the whole file
    pub range: Option<TimeRange>,
    /// `false` when the file has no audio track to read
    pub has_audio: bool,
}

impl RenderInput {
    pub fn whole(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            range: None,
            has_audio: true,
        }
    }

    pub fn ranged(path: impl Into<PathBuf>, range: TimeRange) -> Self {
        Self {
            path: path.into(),
            range: Some(range),
            has_audio: true,
        }
    }

    /// Mark the input as having no audio track.
    pub fn silent(mut self) -> Self {
        self.has_audio = false;
        self
    }
}

/// How inputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderLayout {
    /// One input in, one file out
    Single,
    /// Picture from the first input, sound from the second
    Merge,
    /// Inputs played back to back in order
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPlan {
    Drop,
    Copy,
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPlan {
    Drop,
    Copy,
    Aac,
    Mp3 { bitrate_kbps: u32 },
}

impl AudioPlan {
    pub fn for_container(container: AudioContainer, mp3_bitrate_kbps: u32) -> Self {
        match container {
            AudioContainer::Mp3 => AudioPlan::Mp3 {
                bitrate_kbps: mp3_bitrate_kbps,
            },
            AudioContainer::Mp4Audio => AudioPlan::Aac,
        }
    }
}

/// Everything the media pipeline needs to write one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub inputs: Vec<RenderInput>,
    pub layout: RenderLayout,
    pub video: VideoPlan,
    pub audio: AudioPlan,
    /// Frame size every video input is fitted to when concatenating
    pub canvas: Option<(u32, u32)>,
    pub output: PathBuf,
}

impl RenderJob {
    /// Output duration implied by the input ranges, when all are ranged.
    pub fn expected_seconds(&self) -> Option<u32> {
        let ranges: Option<Vec<u32>> = self
            .inputs
            .iter()
            .map(|i| i.range.map(|r| r.length()))
            .collect();
        let ranges = ranges?;
        match self.layout {
            RenderLayout::Concat => Some(ranges.iter().sum()),
            RenderLayout::Single | RenderLayout::Merge => ranges.first().copied(),
        }
    }
}

/// Port for the media encode pipeline
pub trait MediaPort: Send + Sync {
    /// Write `job.output`. Encoder processes are attached to `ctx` so a
    /// forced shutdown can stop them.
    fn render(&self, job: &RenderJob, ctx: &TaskContext) -> DomainResult<()>;
}

/// An open HTTP body
pub struct RemoteStream {
    /// Length declared by the server, if any
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

/// Port for blocking byte-stream retrieval
pub trait StreamPort: Send + Sync {
    fn open(&self, url: &str) -> DomainResult<RemoteStream>;
}

/// Port for the remote metadata service
#[async_trait]
pub trait MetadataPort: Send + Sync {
    /// Title, content id and track URLs for an identifier
    async fn resolve(&self, id: &MediaIdentifier) -> DomainResult<VideoManifest>;
}

/// Port for decisions only the user can make
pub trait PromptPort: Send + Sync {
    /// `None` means the question was dismissed and the request is dropped
    fn choose_format(&self, question: FormatQuestion) -> Option<FormatAnswer>;

    fn choose_shutdown(&self, active: usize) -> ShutdownChoice;
}

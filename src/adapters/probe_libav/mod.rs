// Probe LibAV adapter - In-process media probing through libav
//
// Built only with the `libav` feature. Every demuxer opened here is dropped
// before the call returns.

use std::path::Path;
use std::sync::Once;

use ffmpeg_next::format::stream::Disposition;
use ffmpeg_next::media::Type;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::ports::*;

static INIT: Once = Once::new();

/// LibAV-based media probing adapter
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create the adapter, initializing libav once per process
    pub fn new() -> Result<Self, DomainError> {
        let mut failure = None;
        INIT.call_once(|| {
            if let Err(e) = ffmpeg_next::init() {
                failure = Some(e.to_string());
            }
        });
        if let Some(message) = failure {
            warn!(error = %message, "libav initialization failed");
            return Err(DomainError::Media(format!("failed to initialize libav: {}", message)));
        }
        Ok(Self)
    }

    fn open(path: &Path) -> DomainResult<ffmpeg_next::format::context::Input> {
        ffmpeg_next::format::input(&path)
            .map_err(|e| DomainError::Media(format!("cannot open {}: {}", path.display(), e)))
    }

    fn container_seconds(input: &ffmpeg_next::format::context::Input) -> Option<f64> {
        let duration = input.duration();
        if duration <= 0 {
            return None;
        }
        Some(duration as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE))
    }

    fn stream_seconds(stream: &ffmpeg_next::format::stream::Stream) -> Option<f64> {
        let duration = stream.duration();
        let base = stream.time_base();
        if duration <= 0 || base.denominator() == 0 {
            return None;
        }
        Some(duration as f64 * f64::from(base.numerator()) / f64::from(base.denominator()))
    }
}

impl ProbePort for ProbeLibavAdapter {
    fn open_audio(&self, path: &Path) -> DomainResult<AudioProbe> {
        let input = Self::open(path)?;
        let stream = input
            .streams()
            .best(Type::Audio)
            .ok_or_else(|| DomainError::Media("no audio stream found".to_string()))?;
        let duration_seconds = Self::stream_seconds(&stream).or_else(|| Self::container_seconds(&input));
        debug!(path = %path.display(), ?duration_seconds, "libav audio probe");
        Ok(AudioProbe { duration_seconds })
    }

    fn open_video(&self, path: &Path) -> DomainResult<VideoProbe> {
        let input = Self::open(path)?;
        let stream = input
            .streams()
            .filter(|s| s.parameters().medium() == Type::Video)
            .find(|s| !s.disposition().contains(Disposition::ATTACHED_PIC))
            .ok_or_else(|| DomainError::Media("no video stream found".to_string()))?;

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| DomainError::Media(format!("cannot read video parameters: {}", e)))?;

        let (width, height) = (decoder.width(), decoder.height());
        if width == 0 || height == 0 {
            return Err(DomainError::Media("video stream has an empty frame".to_string()));
        }

        Ok(VideoProbe {
            width,
            height,
            duration_seconds: Self::stream_seconds(&stream).or_else(|| Self::container_seconds(&input)),
            has_embedded_audio: input.streams().best(Type::Audio).is_some(),
        })
    }
}

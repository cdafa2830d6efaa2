//! Stream prober
//!
//! Combines the two independent probe attempts into a [`StreamDescriptor`].

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::StreamDescriptor;
use crate::ports::ProbePort;

#[derive(Clone)]
pub struct StreamProber {
    port: Arc<dyn ProbePort>,
}

impl StreamProber {
    pub fn new(port: Arc<dyn ProbePort>) -> Self {
        Self { port }
    }

    /// Determine which tracks a file has and how long it runs.
    ///
    /// A failed attempt only rules out that kind of track. The file is
    /// unreadable when both attempts fail.
    pub fn probe(&self, path: &Path) -> DomainResult<StreamDescriptor> {
        if !path.is_file() {
            return Err(DomainError::FsFail(format!(
                "input file does not exist: {}",
                path.display()
            )));
        }

        let audio = self.port.open_audio(path);
        if let Err(e) = &audio {
            debug!(path = %path.display(), error = %e, "audio probe failed");
        }
        let video = self.port.open_video(path);
        if let Err(e) = &video {
            debug!(path = %path.display(), error = %e, "video probe failed");
        }

        match (audio, video) {
            (Err(audio_err), Err(video_err)) => Err(DomainError::Unreadable(format!(
                "{} is neither valid video nor valid audio ({}; {})",
                path.display(),
                audio_err,
                video_err
            ))),
            (audio, video) => {
                let audio = audio.ok();
                let video = video.ok();
                let duration = audio
                    .as_ref()
                    .and_then(|a| a.duration_seconds)
                    .or_else(|| video.as_ref().and_then(|v| v.duration_seconds))
                    .unwrap_or(0.0);

                Ok(StreamDescriptor {
                    has_video: video.is_some(),
                    has_audio: audio.is_some()
                        || video.as_ref().map(|v| v.has_embedded_audio).unwrap_or(false),
                    duration_seconds: whole_seconds(duration),
                    width: video.as_ref().map(|v| v.width),
                    height: video.as_ref().map(|v| v.height),
                })
            }
        }
    }
}

fn whole_seconds(seconds: f64) -> u32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

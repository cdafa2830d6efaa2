// Fetch interactor - Remote download, merge and conversion

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::progress::in_flight_percent;
use crate::engine::{PendingFile, TaskContext};
use crate::ports::*;
use crate::utils::path::ensure_dir;

/// Knobs the fetch unit takes from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub downloads_dir: PathBuf,
    pub chunk_size: usize,
    pub mp3_bitrate_kbps: u32,
}

/// Interactor for the fetch use case
pub struct FetchInteractor {
    metadata: Arc<dyn MetadataPort>,
    streams: Arc<dyn StreamPort>,
    media: Arc<dyn MediaPort>,
    settings: FetchSettings,
}

impl FetchInteractor {
    pub fn new(
        metadata: Arc<dyn MetadataPort>,
        streams: Arc<dyn StreamPort>,
        media: Arc<dyn MediaPort>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            metadata,
            streams,
            media,
            settings,
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Run one fetch to completion on the calling thread.
    ///
    /// Must not be called from inside an async runtime: metadata resolution
    /// drives its own.
    pub fn execute(&self, request: &FetchRequest, ctx: &TaskContext) -> DomainResult<PathBuf> {
        self.phase(ctx, FetchPhase::Created);
        let result = self.run(request, ctx);
        match &result {
            Ok(path) => {
                self.phase(ctx, FetchPhase::Done);
                info!(task_id = %ctx.id(), output = %path.display(), "fetch finished");
            }
            Err(DomainError::Aborted) => {}
            Err(e) => {
                self.phase(ctx, FetchPhase::Failed);
                warn!(task_id = %ctx.id(), error = %e, "fetch failed");
            }
        }
        result
    }

    fn run(&self, request: &FetchRequest, ctx: &TaskContext) -> DomainResult<PathBuf> {
        self.phase(ctx, FetchPhase::Resolving);
        let id = MediaIdentifier::from_url(&request.url)?;
        let manifest = self.resolve(&id)?;
        ctx.check_cancelled()?;

        let dir = &self.settings.downloads_dir;
        ensure_dir(dir)?;
        let output_path = dir.join(OutputNaming::fetch_output(&manifest.title, request.mode));
        let temp_path = |track| dir.join(OutputNaming::temp_track(track, &id, &manifest.content_id));

        match request.mode {
            FetchMode::Mp4 => {
                let url = manifest.first_video()?;
                let output = PendingFile::new(ctx, output_path);
                self.phase(ctx, FetchPhase::Streaming { index: 1, of: 1 });
                self.download(url, output.path(), ctx)?;
                Ok(output.commit())
            }
            FetchMode::Mp3 | FetchMode::Mp4Audio => {
                let url = manifest.first_audio()?;
                let temp = PendingFile::new(ctx, temp_path(TrackFile::Audio));
                self.phase(ctx, FetchPhase::Streaming { index: 1, of: 1 });
                self.download(url, temp.path(), ctx)?;

                self.phase(ctx, FetchPhase::Converting);
                let container = match request.mode {
                    FetchMode::Mp3 => AudioContainer::Mp3,
                    _ => AudioContainer::Mp4Audio,
                };
                let output = PendingFile::new(ctx, output_path);
                let job = RenderJob {
                    inputs: vec![RenderInput::whole(temp.path())],
                    layout: RenderLayout::Single,
                    video: VideoPlan::Drop,
                    audio: AudioPlan::for_container(container, self.settings.mp3_bitrate_kbps),
                    canvas: None,
                    output: output.path().to_path_buf(),
                };
                let rendered = self.media.render(&job, ctx);

                // The intermediate goes whether or not conversion worked
                let report = temp.discard();
                if !report.is_clean() {
                    warn!(task_id = %ctx.id(), "audio intermediate could not be removed");
                }
                rendered?;
                Ok(output.commit())
            }
            FetchMode::Full => {
                let video_url = manifest.first_video()?;
                let audio_url = manifest.first_audio()?;
                let video = PendingFile::new(ctx, temp_path(TrackFile::Video));
                let audio = PendingFile::new(ctx, temp_path(TrackFile::Audio));

                self.phase(ctx, FetchPhase::Streaming { index: 1, of: 2 });
                self.download(video_url, video.path(), ctx)?;
                self.phase(ctx, FetchPhase::Streaming { index: 2, of: 2 });
                self.download(audio_url, audio.path(), ctx)?;

                self.phase(ctx, FetchPhase::Merging);
                let output = PendingFile::new(ctx, output_path);
                let job = RenderJob {
                    inputs: vec![RenderInput::whole(video.path()), RenderInput::whole(audio.path())],
                    layout: RenderLayout::Merge,
                    video: VideoPlan::Copy,
                    audio: AudioPlan::Copy,
                    canvas: None,
                    output: output.path().to_path_buf(),
                };

                match self.media.render(&job, ctx) {
                    Ok(()) => {
                        let mut report = video.discard();
                        report.merge(audio.discard());
                        debug!(task_id = %ctx.id(), removed = report.removed.len(), "intermediates removed");
                        Ok(output.commit())
                    }
                    Err(DomainError::Aborted) => Err(DomainError::Aborted),
                    Err(e) => {
                        warn!(
                            task_id = %ctx.id(),
                            video = %video.path().display(),
                            audio = %audio.path().display(),
                            "merge failed, keeping intermediates"
                        );
                        video.keep();
                        audio.keep();
                        Err(DomainError::MergeFailed(e.to_string()))
                    }
                }
            }
        }
    }

    fn resolve(&self, id: &MediaIdentifier) -> DomainResult<VideoManifest> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DomainError::Metadata(format!("failed to start resolver runtime: {}", e)))?;
        runtime.block_on(self.metadata.resolve(id))
    }

    /// Stream `url` into `dest` in fixed-size chunks.
    ///
    /// Progress stays below 100 until the body is fully written and synced.
    pub fn download(&self, url: &str, dest: &Path, ctx: &TaskContext) -> DomainResult<u64> {
        ctx.check_cancelled()?;
        let RemoteStream {
            content_length,
            mut body,
        } = self.streams.open(url)?;

        let mut file = File::create(dest).map_err(|e| DomainError::io(dest.display(), e))?;
        ctx.begin_stream();

        let mut buffer = vec![0u8; self.settings.chunk_size.max(1)];
        let mut written: u64 = 0;
        loop {
            ctx.check_cancelled()?;
            let read = match body.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DomainError::Network(format!("reading {} failed: {}", url, e)));
                }
            };
            file.write_all(&buffer[..read])
                .map_err(|e| DomainError::io(dest.display(), e))?;
            written += read as u64;
            if let Some(percent) = in_flight_percent(written, content_length) {
                ctx.progress(percent);
            }
        }

        file.flush().map_err(|e| DomainError::io(dest.display(), e))?;
        file.sync_all().map_err(|e| DomainError::io(dest.display(), e))?;

        if let Some(expected) = content_length {
            if written < expected {
                return Err(DomainError::Network(format!(
                    "connection closed after {} of {} bytes",
                    written, expected
                )));
            }
            ctx.progress(100);
        }
        debug!(task_id = %ctx.id(), dest = %dest.display(), bytes = written, "stream written");
        Ok(written)
    }

    fn phase(&self, ctx: &TaskContext, phase: FetchPhase) {
        debug!(task_id = %ctx.id(), %phase, "fetch phase");
        ctx.status(phase.to_string());
    }
}

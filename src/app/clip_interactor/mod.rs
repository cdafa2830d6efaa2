// Clip interactor - Orchestrates the clipping use case

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{PendingFile, TaskContext};
use crate::ports::*;
use crate::probe::StreamProber;

/// Interactor for the clip use case
pub struct ClipInteractor {
    prober: StreamProber,
    media: Arc<dyn MediaPort>,
    mp3_bitrate_kbps: u32,
}

impl ClipInteractor {
    /// Create new clip interactor with injected ports
    pub fn new(prober: StreamProber, media: Arc<dyn MediaPort>, mp3_bitrate_kbps: u32) -> Self {
        Self {
            prober,
            media,
            mp3_bitrate_kbps,
        }
    }

    /// Cut `request.range` out of the source.
    ///
    /// Track checks happen before any file is created. A failed render
    /// leaves no partial output behind.
    pub fn execute(&self, request: &ClipRequest, ctx: &TaskContext) -> DomainResult<PathBuf> {
        let descriptor = self.prober.probe(&request.source)?;
        ctx.check_cancelled()?;

        let route = ClipPlanner::plan(&request.source, &descriptor, request.target)?;
        if descriptor.duration_seconds > 0 {
            request.range.ensure_within(descriptor.duration_seconds)?;
        }
        info!(
            task_id = %ctx.id(),
            source = %request.source.display(),
            range = %request.range,
            ?route,
            "clip planned"
        );

        let output = PendingFile::new(
            ctx,
            OutputNaming::clip_output(&request.source, &request.range, route.extension()),
        );
        ctx.status(format!("clipping {}", request.range));

        let (video, audio) = match route {
            ClipRoute::Video { strip_audio: true } => (VideoPlan::H264, AudioPlan::Drop),
            ClipRoute::Video { strip_audio: false } => (VideoPlan::H264, AudioPlan::Aac),
            ClipRoute::Audio(container) => (
                VideoPlan::Drop,
                AudioPlan::for_container(container, self.mp3_bitrate_kbps),
            ),
        };

        let job = RenderJob {
            inputs: vec![RenderInput::ranged(&request.source, request.range)],
            layout: RenderLayout::Single,
            video,
            audio,
            canvas: None,
            output: output.path().to_path_buf(),
        };
        self.media.render(&job, ctx)?;
        Ok(output.commit())
    }
}

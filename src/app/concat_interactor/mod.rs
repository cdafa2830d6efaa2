// Concat interactor - Joins two trimmed inputs back to back

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{PendingFile, TaskContext};
use crate::ports::*;
use crate::probe::StreamProber;

pub struct ConcatInteractor {
    prober: StreamProber,
    media: Arc<dyn MediaPort>,
    mp3_bitrate_kbps: u32,
}

impl ConcatInteractor {
    pub fn new(prober: StreamProber, media: Arc<dyn MediaPort>, mp3_bitrate_kbps: u32) -> Self {
        Self {
            prober,
            media,
            mp3_bitrate_kbps,
        }
    }

    /// Write `first[first_range]` followed by `second[second_range]`.
    pub fn execute(&self, request: &ConcatRequest, ctx: &TaskContext) -> DomainResult<PathBuf> {
        let first = self.prober.probe(&request.first)?;
        let second = self.prober.probe(&request.second)?;
        ConcatPolicy::check(request.mode, &first, &second)?;

        for (descriptor, range) in [(&first, &request.first_range), (&second, &request.second_range)] {
            if descriptor.duration_seconds > 0 {
                range.ensure_within(descriptor.duration_seconds)?;
            }
        }
        ctx.check_cancelled()?;

        let any_audio = first.has_audio || second.has_audio;
        let (video, audio) = match request.mode {
            // Sound is kept where it exists; a silent input plays silence
            ConcatMode::Video if any_audio => (VideoPlan::H264, AudioPlan::Aac),
            ConcatMode::Video => (VideoPlan::H264, AudioPlan::Drop),
            ConcatMode::VideoOnly => (VideoPlan::H264, AudioPlan::Drop),
            ConcatMode::Audio(container) => (
                VideoPlan::Drop,
                AudioPlan::for_container(container, self.mp3_bitrate_kbps),
            ),
        };
        // Everything is fitted to the first input's frame
        let canvas = if request.mode.is_video() {
            first.dimensions()
        } else {
            None
        };
        if let (Some(a), Some(b)) = (first.dimensions(), second.dimensions()) {
            if a != b && request.mode.is_video() {
                debug!(task_id = %ctx.id(), first = ?a, second = ?b, "frame sizes differ, fitting second input");
            }
        }

        let output = PendingFile::new(
            ctx,
            OutputNaming::concat_output(&request.first, &request.first_range, &request.second_range, request.mode),
        );
        info!(
            task_id = %ctx.id(),
            output = %output.path().display(),
            mode = ?request.mode,
            "concat planned"
        );
        ctx.status(format!(
            "joining {} + {}",
            request.first_range, request.second_range
        ));

        let input = |path: &PathBuf, range: TimeRange, descriptor: &StreamDescriptor| {
            let input = RenderInput::ranged(path, range);
            if descriptor.has_audio {
                input
            } else {
                input.silent()
            }
        };
        let job = RenderJob {
            inputs: vec![
                input(&request.first, request.first_range, &first),
                input(&request.second, request.second_range, &second),
            ],
            layout: RenderLayout::Concat,
            video,
            audio,
            canvas,
            output: output.path().to_path_buf(),
        };
        self.media.render(&job, ctx)?;
        Ok(output.commit())
    }
}

//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` executable for every render job. Progress comes from
//! `-progress pipe:1` on stdout; stderr is drained on its own thread and
//! only its tail is kept for error messages.

pub mod args;
pub mod progress;

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::engine::TaskContext;
use crate::ports::*;

use self::progress::ProgressLine;

/// Stderr lines kept for failure messages
const STDERR_TAIL_LINES: usize = 12;

/// FFmpeg-based execution adapter
pub struct FfmpegAdapter {
    ffmpeg: PathBuf,
}

impl FfmpegAdapter {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Whether the configured executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl MediaPort for FfmpegAdapter {
    fn render(&self, job: &RenderJob, ctx: &TaskContext) -> DomainResult<()> {
        ctx.check_cancelled()?;
        let args = args::build_args(job)?;
        info!(task_id = %ctx.id(), output = %job.output.display(), layout = ?job.layout, "starting ffmpeg");
        debug!(task_id = %ctx.id(), ?args, "ffmpeg arguments");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DomainError::Media(format!("failed to start ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::Media("failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::Media("failed to capture ffmpeg stderr".to_string()))?;

        let handle = ctx.attach_process(child)?;

        let announced: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));
        let stderr_announced = Arc::clone(&announced);
        let stderr_reader = thread::spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if let ProgressLine::Duration(seconds) = progress::parse_line(&line) {
                    stderr_announced.lock().get_or_insert(seconds);
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail)
        });

        ctx.begin_stream();
        let expected = job.expected_seconds().map(f64::from);
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if let ProgressLine::OutTime(position) = progress::parse_line(&line) {
                let total = expected.or(*announced.lock());
                if let Some(percent) = total.and_then(|t| progress::percent(position, t)) {
                    ctx.progress(percent);
                }
            }
        }

        let tail = stderr_reader.join().unwrap_or_default();

        // Gone from the context means the registry killed it
        let Some(mut child) = ctx.detach_process(handle) else {
            return Err(DomainError::Aborted);
        };
        let status = child
            .wait()
            .map_err(|e| DomainError::Media(format!("failed to wait for ffmpeg: {}", e)))?;
        ctx.check_cancelled()?;

        if status.success() {
            ctx.progress(100);
            info!(task_id = %ctx.id(), output = %job.output.display(), "ffmpeg finished");
            Ok(())
        } else {
            let summary = progress::error_summary(&tail, status.code());
            warn!(task_id = %ctx.id(), code = ?status.code(), error = %summary, "ffmpeg failed");
            Err(DomainError::Media(summary))
        }
    }
}

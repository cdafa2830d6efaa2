// Request interactor - Turns user intents into ready-to-run task specs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::PromptPort;
use crate::probe::StreamProber;

/// A clip as the user asked for it, before any format decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipDraft {
    pub source: PathBuf,
    pub start_seconds: u32,
    /// `None` runs to the end of the source
    pub end_seconds: Option<u32>,
    pub intent: ClipIntent,
    /// Answer given up front; the prompt is skipped when it fits the question
    pub preset: Option<FormatAnswer>,
}

/// A concatenation as the user asked for it, before any format decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatDraft {
    pub first: PathBuf,
    pub first_range: TimeRange,
    pub second: PathBuf,
    pub second_range: TimeRange,
    pub intent: ConcatIntent,
    pub preset: Option<FormatAnswer>,
}

/// Settles every decision a task needs before it is submitted
pub struct RequestInteractor {
    prober: StreamProber,
    prompt: Arc<dyn PromptPort>,
}

impl RequestInteractor {
    pub fn new(prober: StreamProber, prompt: Arc<dyn PromptPort>) -> Self {
        Self { prober, prompt }
    }

    /// Build a clip task. `Ok(None)` means the format question was dismissed.
    pub fn clip_spec(&self, draft: ClipDraft) -> DomainResult<Option<TaskSpec>> {
        let descriptor = self.prober.probe(&draft.source)?;
        let end = draft.end_seconds.unwrap_or(descriptor.duration_seconds);
        let range = TimeRange::new(draft.start_seconds, end)?;

        let question = FormatPolicy::clip_question(&draft.source, &descriptor, draft.intent)?;
        let answer = match self.settle(question, draft.preset)? {
            Decision::Use(answer) => answer,
            Decision::Dismissed => {
                info!(source = %draft.source.display(), "format question dismissed, clip dropped");
                return Ok(None);
            }
        };

        let target = FormatPolicy::clip_target(draft.intent, &descriptor, answer);
        Ok(Some(TaskSpec::Clip(ClipRequest {
            source: draft.source,
            range,
            target,
        })))
    }

    /// Build a concat task. `Ok(None)` means the format question was dismissed.
    pub fn concat_spec(&self, draft: ConcatDraft) -> DomainResult<Option<TaskSpec>> {
        let question = FormatPolicy::concat_question(draft.intent);
        let answer = match self.settle(question, draft.preset)? {
            Decision::Use(answer) => answer,
            Decision::Dismissed => {
                info!(first = %draft.first.display(), "format question dismissed, concat dropped");
                return Ok(None);
            }
        };

        Ok(Some(TaskSpec::Concat(ConcatRequest {
            first: draft.first,
            first_range: draft.first_range,
            second: draft.second,
            second_range: draft.second_range,
            mode: FormatPolicy::concat_mode(draft.intent, answer),
        })))
    }

    /// Use a fitting preset, or ask the question once.
    fn settle(&self, question: Option<FormatQuestion>, preset: Option<FormatAnswer>) -> DomainResult<Decision> {
        let Some(question) = question else {
            return Ok(Decision::Use(preset));
        };
        match preset {
            Some(preset) if question.accepts(preset) => Ok(Decision::Use(Some(preset))),
            Some(preset) => Err(DomainError::BadArgs(format!(
                "'{}' does not answer: {}",
                preset.label(),
                question.prompt()
            ))),
            None => {
                debug!(?question, "asking for output format");
                Ok(match self.prompt.choose_format(question) {
                    Some(answer) => Decision::Use(Some(answer)),
                    None => Decision::Dismissed,
                })
            }
        }
    }
}

enum Decision {
    Use(Option<FormatAnswer>),
    Dismissed,
}

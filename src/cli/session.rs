//! Interface-thread session loop
//!
//! Receives task events, hands them to the registry and reacts to Ctrl-C
//! with the shutdown question. Specs beyond `max_parallel` wait in a queue
//! and are submitted as running tasks finish.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::model::{Outcome, TaskSpec};
use crate::engine::{
    CloseRequest, EventPayload, EventReceiver, Lifecycle, ShutdownChoice, TaskRegistry,
};
use crate::ports::PromptPort;

/// How a session ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub completed: usize,
    pub failed: usize,
    /// Queued specs never started because of a shutdown
    pub dropped: usize,
    pub terminated: bool,
}

impl SessionSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.dropped == 0 && !self.terminated
    }
}

pub struct Session {
    registry: Arc<TaskRegistry>,
    events: EventReceiver,
    prompt: Arc<dyn PromptPort>,
    pending: VecDeque<TaskSpec>,
    max_parallel: usize,
    summary: SessionSummary,
}

impl Session {
    pub fn new(
        registry: Arc<TaskRegistry>,
        events: EventReceiver,
        prompt: Arc<dyn PromptPort>,
        specs: Vec<TaskSpec>,
        max_parallel: usize,
    ) -> Self {
        Self {
            registry,
            events,
            prompt,
            pending: specs.into(),
            max_parallel: max_parallel.max(1),
            summary: SessionSummary::default(),
        }
    }

    /// Run until every task has reported, or a shutdown completes.
    pub async fn run(mut self) -> SessionSummary {
        self.fill();
        while !self.is_idle() {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        warn!("event channel closed with tasks outstanding");
                        break;
                    };
                    if let EventPayload::Terminal(outcome) = &event.payload {
                        self.tally(outcome);
                    }
                    let terminal = event.is_terminal();
                    if self.registry.dispatch(event) == Lifecycle::ExitReady {
                        break;
                    }
                    if terminal {
                        self.fill();
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!(error = %e, "could not listen for Ctrl-C");
                        continue;
                    }
                    if self.on_interrupt().await == Lifecycle::ExitReady {
                        break;
                    }
                }
            }
        }
        self.summary.dropped += self.pending.len();
        self.summary
    }

    async fn on_interrupt(&mut self) -> Lifecycle {
        match self.registry.request_close() {
            CloseRequest::ExitNow => {
                info!("interrupted with no running tasks");
                Lifecycle::ExitReady
            }
            CloseRequest::NeedsDecision { active } => {
                let prompt = Arc::clone(&self.prompt);
                let choice = tokio::task::spawn_blocking(move || prompt.choose_shutdown(active))
                    .await
                    .unwrap_or(ShutdownChoice::WaitForTasks);
                if choice == ShutdownChoice::TerminateNow {
                    self.summary.terminated = true;
                }
                if choice != ShutdownChoice::KeepRunning {
                    debug!(queued = self.pending.len(), "queued tasks dropped by shutdown");
                    self.summary.dropped += self.pending.len();
                    self.pending.clear();
                }
                self.registry.resolve_close(choice)
            }
        }
    }

    /// Submit queued specs while there is room.
    fn fill(&mut self) {
        if self.registry.is_closing() {
            return;
        }
        while self.registry.active_count() < self.max_parallel {
            let Some(spec) = self.pending.pop_front() else {
                break;
            };
            let kind = spec.kind();
            if let Err(e) = self.registry.submit(spec) {
                warn!(kind = %kind, error = %e, "task not started");
                self.summary.failed += 1;
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.registry.active_count() == 0
    }

    fn tally(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Completed(_) => self.summary.completed += 1,
            Outcome::Failed(_) => self.summary.failed += 1,
            Outcome::Aborted => {}
        }
    }
}

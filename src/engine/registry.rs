//! Task registry and shutdown coordinator
//!
//! The registry owns `{closing, active}` behind one lock. Every mutation of
//! the active set goes through it: tasks are inserted while their thread is
//! being spawned and removed when their terminal event is dispatched, so the
//! rule "exit only once `active` is empty" can be checked in one place.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::{Outcome, TaskKind, TaskSpec};
use crate::engine::cleanup::{self, CleanupReport};
use crate::engine::context::TaskContext;
use crate::engine::events::*;

/// Runs one task to completion on the calling thread
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, spec: &TaskSpec, ctx: &TaskContext) -> Outcome;
}

/// Answer to a close request made while tasks are running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownChoice {
    /// Stop every task now and exit without waiting
    TerminateNow,
    /// Exit once every task has reported its outcome
    WaitForTasks,
    /// Forget the close request
    KeepRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    /// Nothing is running
    ExitNow,
    /// Tasks are running; a `ShutdownChoice` is required
    NeedsDecision { active: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    ExitReady,
}

struct ActiveTask {
    kind: TaskKind,
    ctx: TaskContext,
    thread: Option<JoinHandle<()>>,
    started: Instant,
}

#[derive(Default)]
struct RegistryState {
    closing: bool,
    active: HashMap<TaskId, ActiveTask>,
}

pub struct TaskRegistry {
    executor: Arc<dyn TaskExecutor>,
    events: EventSender,
    observers: RwLock<Vec<Arc<dyn TaskObserver>>>,
    state: Mutex<RegistryState>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new(executor: Arc<dyn TaskExecutor>, events: EventSender) -> Self {
        Self {
            executor,
            events,
            observers: RwLock::new(Vec::new()),
            state: Mutex::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn TaskObserver>) {
        self.observers.write().push(observer);
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn is_closing(&self) -> bool {
        self.state.lock().closing
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.state.lock().active.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Start a task on its own thread and add it to the active set.
    pub fn submit(&self, spec: TaskSpec) -> DomainResult<TaskId> {
        let kind = spec.kind();
        let mut state = self.state.lock();
        if state.closing {
            return Err(DomainError::BadArgs(
                "shutdown in progress, no new tasks are accepted".to_string(),
            ));
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let ctx = TaskContext::new(id, kind, self.events.clone());
        let executor = Arc::clone(&self.executor);
        let thread_ctx = ctx.clone();

        let thread = thread::Builder::new()
            .name(format!("{}-{}", kind, id.0))
            .spawn(move || run_task(executor, spec, thread_ctx))
            .map_err(|e| DomainError::BadArgs(format!("could not start task thread: {}", e)))?;

        state.active.insert(
            id,
            ActiveTask {
                kind,
                ctx,
                thread: Some(thread),
                started: Instant::now(),
            },
        );
        info!(task_id = %id, kind = %kind, "task submitted");
        Ok(id)
    }

    /// Route one event; returns `ExitReady` when a pending close can complete.
    pub fn dispatch(&self, event: TaskEvent) -> Lifecycle {
        let TaskEvent {
            task_id,
            kind,
            payload,
        } = event;

        match payload {
            EventPayload::Terminal(outcome) => self.on_terminal(task_id, kind, outcome),
            EventPayload::Progress(percent) => {
                if self.should_forward(task_id) {
                    for observer in self.observers.read().iter() {
                        observer.on_progress(task_id, kind, percent);
                    }
                }
                Lifecycle::Running
            }
            EventPayload::Status(message) => {
                if self.should_forward(task_id) {
                    for observer in self.observers.read().iter() {
                        observer.on_status(task_id, kind, &message);
                    }
                }
                Lifecycle::Running
            }
        }
    }

    fn should_forward(&self, task_id: TaskId) -> bool {
        let state = self.state.lock();
        !state.closing && state.active.contains_key(&task_id)
    }

    fn on_terminal(&self, task_id: TaskId, kind: TaskKind, outcome: Outcome) -> Lifecycle {
        let (removed, closing, remaining) = {
            let mut state = self.state.lock();
            let removed = state.active.remove(&task_id);
            (removed, state.closing, state.active.len())
        };

        let Some(mut task) = removed else {
            debug!(task_id = %task_id, "terminal event for a discarded task ignored");
            return Lifecycle::Running;
        };

        // The thread has sent its last event; joining only reaps it
        if let Some(handle) = task.thread.take() {
            if handle.join().is_err() {
                warn!(task_id = %task_id, "task thread panicked after reporting");
            }
        }
        info!(
            task_id = %task_id,
            kind = %task.kind,
            success = outcome.is_success(),
            elapsed_ms = task.started.elapsed().as_millis() as u64,
            remaining,
            "task finished"
        );

        if closing {
            return if remaining == 0 {
                Lifecycle::ExitReady
            } else {
                Lifecycle::Running
            };
        }

        if let Some(message) = outcome.message(kind) {
            for observer in self.observers.read().iter() {
                observer.on_terminal(task_id, kind, &message, &outcome);
            }
        }
        Lifecycle::Running
    }

    /// Ask to exit. With tasks running this marks the registry as closing
    /// until `resolve_close` is called.
    pub fn request_close(&self) -> CloseRequest {
        let mut state = self.state.lock();
        state.closing = true;
        if state.active.is_empty() {
            CloseRequest::ExitNow
        } else {
            CloseRequest::NeedsDecision {
                active: state.active.len(),
            }
        }
    }

    pub fn resolve_close(&self, choice: ShutdownChoice) -> Lifecycle {
        info!(?choice, "shutdown decision");
        match choice {
            ShutdownChoice::TerminateNow => {
                let report = self.terminate_all();
                if !report.is_clean() {
                    warn!(failed = report.failed.len(), "some task files could not be removed");
                }
                Lifecycle::ExitReady
            }
            ShutdownChoice::WaitForTasks => {
                let mut state = self.state.lock();
                state.closing = true;
                if state.active.is_empty() {
                    Lifecycle::ExitReady
                } else {
                    Lifecycle::Running
                }
            }
            ShutdownChoice::KeepRunning => {
                self.state.lock().closing = false;
                Lifecycle::Running
            }
        }
    }

    /// Force-close every task's encoders, discard the active set and delete
    /// the files the tasks still owned. Task threads are detached.
    pub fn terminate_all(&self) -> CleanupReport {
        let tasks: Vec<(TaskId, ActiveTask)> = {
            let mut state = self.state.lock();
            state.closing = true;
            state.active.drain().collect()
        };

        let mut owned = Vec::new();
        for (id, task) in tasks {
            let stopped = task.ctx.force_close();
            owned.extend(task.ctx.owned_paths());
            info!(task_id = %id, kind = %task.kind, stopped, "task terminated");
            drop(task.thread);
        }

        let report = cleanup::remove_all(&owned);
        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "forced termination cleanup done"
        );
        report
    }
}

fn run_task(executor: Arc<dyn TaskExecutor>, spec: TaskSpec, ctx: TaskContext) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&spec, &ctx)));
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => Outcome::Failed(DomainError::Media("task stopped unexpectedly".to_string())),
    };
    // A late outcome from a terminated task is dropped by the registry
    if ctx.is_cancelled() {
        ctx.finish(Outcome::Aborted);
    } else {
        ctx.finish(outcome);
    }
}

//! Per-task execution context
//!
//! A [`TaskContext`] is shared between the task's own thread and the
//! registry. It owns the cancellation flag, the encoder processes the task
//! has running, and the temporary or partial files the task is producing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::{Outcome, TaskKind};
use crate::engine::cleanup::{self, CleanupReport};
use crate::engine::events::*;
use crate::engine::progress::ProgressGate;

/// Handle to a process registered with a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(u64);

#[derive(Clone)]
pub struct TaskContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: TaskId,
    kind: TaskKind,
    cancelled: AtomicBool,
    next_handle: AtomicU64,
    processes: Mutex<HashMap<u64, Child>>,
    owned: Mutex<Vec<PathBuf>>,
    gate: Mutex<ProgressGate>,
    events: EventSender,
}

impl TaskContext {
    pub fn new(id: TaskId, kind: TaskKind, events: EventSender) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                kind,
                cancelled: AtomicBool::new(false),
                next_handle: AtomicU64::new(0),
                processes: Mutex::new(HashMap::new()),
                owned: Mutex::new(Vec::new()),
                gate: Mutex::new(ProgressGate::new()),
                events,
            }),
        }
    }

    /// Context with its own channel, for running a unit outside a registry.
    pub fn standalone(kind: TaskKind) -> (Self, EventReceiver) {
        let (tx, rx) = event_channel();
        (Self::new(TaskId(0), kind, tx), rx)
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn kind(&self) -> TaskKind {
        self.inner.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once the registry has terminated the task.
    pub fn check_cancelled(&self) -> DomainResult<()> {
        if self.is_cancelled() {
            Err(DomainError::Aborted)
        } else {
            Ok(())
        }
    }

    fn send(&self, payload: EventPayload) {
        let event = TaskEvent {
            task_id: self.inner.id,
            kind: self.inner.kind,
            payload,
        };
        // A closed channel means nobody is listening any more
        let _ = self.inner.events.send(event);
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(EventPayload::Status(message.into()));
    }

    /// Begin a new progress stream (next file, next encoder run).
    pub fn begin_stream(&self) {
        self.inner.gate.lock().reset();
    }

    /// Report progress; values that do not increase are dropped.
    pub fn progress(&self, percent: u8) {
        let passed = self.inner.gate.lock().advance(percent);
        if let Some(percent) = passed {
            self.send(EventPayload::Progress(percent));
        }
    }

    pub fn finish(&self, outcome: Outcome) {
        self.send(EventPayload::Terminal(outcome));
    }

    /// Record a file this task is responsible for until it commits or
    /// deletes it.
    pub fn own(&self, path: &Path) {
        let mut owned = self.inner.owned.lock();
        if !owned.iter().any(|p| p == path) {
            owned.push(path.to_path_buf());
        }
    }

    pub fn disown(&self, path: &Path) {
        self.inner.owned.lock().retain(|p| p != path);
    }

    pub fn owned_paths(&self) -> Vec<PathBuf> {
        self.inner.owned.lock().clone()
    }

    /// Hand a spawned encoder to the context so a forced shutdown can stop it.
    pub fn attach_process(&self, mut child: Child) -> DomainResult<ProcessHandle> {
        if self.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DomainError::Aborted);
        }
        let key = self.inner.next_handle.fetch_add(1, Ordering::SeqCst);
        self.inner.processes.lock().insert(key, child);
        Ok(ProcessHandle(key))
    }

    /// Take a process back. `None` means it was force-closed meanwhile.
    pub fn detach_process(&self, handle: ProcessHandle) -> Option<Child> {
        self.inner.processes.lock().remove(&handle.0)
    }

    /// Raise the cancellation flag and kill every attached process.
    ///
    /// Returns the number of processes that were stopped.
    pub fn force_close(&self) -> usize {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let children: Vec<Child> = self.inner.processes.lock().drain().map(|(_, c)| c).collect();
        let count = children.len();
        for mut child in children {
            if let Err(e) = child.kill() {
                debug!(task_id = %self.inner.id, error = %e, "encoder already exited");
            }
            if let Err(e) = child.wait() {
                warn!(task_id = %self.inner.id, error = %e, "could not reap encoder");
            }
        }
        count
    }
}

/// Output file that is removed unless explicitly committed or kept.
///
/// The file is owned by the context while the guard lives, so a forced
/// shutdown can delete it even if the task thread never returns.
pub struct PendingFile<'a> {
    ctx: &'a TaskContext,
    path: PathBuf,
    armed: bool,
}

impl<'a> PendingFile<'a> {
    pub fn new(ctx: &'a TaskContext, path: PathBuf) -> Self {
        ctx.own(&path);
        Self {
            ctx,
            path,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file is finished; ownership passes to the caller.
    pub fn commit(mut self) -> PathBuf {
        self.armed = false;
        self.ctx.disown(&self.path);
        std::mem::take(&mut self.path)
    }

    /// Leave the file on disk for manual recovery.
    pub fn keep(mut self) {
        self.armed = false;
        self.ctx.disown(&self.path);
    }

    /// Delete the file now and report what happened.
    pub fn discard(mut self) -> CleanupReport {
        self.armed = false;
        self.ctx.disown(&self.path);
        cleanup::remove_all([&self.path])
    }
}

impl Drop for PendingFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.ctx.disown(&self.path);
            let mut report = CleanupReport::default();
            cleanup::remove_best_effort(&self.path, &mut report);
        }
    }
}

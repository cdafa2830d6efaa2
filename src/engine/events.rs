//! Task events and the channel that carries them to the interface thread
//!
//! Delivery is fire-and-forget. Events of one task arrive in the order the
//! task sent them; nothing is promised across tasks.

use std::fmt;

use tokio::sync::mpsc;

use crate::domain::model::{Outcome, TaskKind};

/// Registry-assigned task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Status(String),
    Progress(u8),
    Terminal(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub payload: EventPayload,
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self.payload, EventPayload::Terminal(_))
    }
}

pub type EventSender = mpsc::UnboundedSender<TaskEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TaskEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Receives the events the registry lets through
pub trait TaskObserver: Send + Sync {
    fn on_status(&self, task_id: TaskId, kind: TaskKind, message: &str);

    fn on_progress(&self, task_id: TaskId, kind: TaskKind, percent: u8);

    /// Called once per reported task with its single outcome line
    fn on_terminal(&self, task_id: TaskId, kind: TaskKind, message: &str, outcome: &Outcome);
}

//! Background task engine
//!
//! Tasks run on their own OS threads and talk to the interface thread only
//! through [`events`]. The [`registry`] tracks what is running and
//! arbitrates shutdown.

pub mod cleanup;
pub mod context;
pub mod events;
pub mod progress;
pub mod registry;

pub use cleanup::CleanupReport;
pub use context::{PendingFile, ProcessHandle, TaskContext};
pub use events::{event_channel, EventPayload, EventReceiver, EventSender, TaskEvent, TaskId, TaskObserver};
pub use registry::{CloseRequest, Lifecycle, ShutdownChoice, TaskExecutor, TaskRegistry};

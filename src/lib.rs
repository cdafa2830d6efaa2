//! streamcut
//!
//! Fetches remote media by link, clips and concatenates local files. Every
//! operation runs as a background task on its own thread; a registry tracks
//! the running tasks and arbitrates shutdown while they are in flight.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{DomainError, DomainResult};
pub use domain::model::{Outcome, StreamDescriptor, TaskKind, TaskSpec, TimeRange};
pub use engine::{ShutdownChoice, TaskRegistry};

//! CLI module for streamcut
//!
//! Argument parsing, the interactive prompts and the session loop that
//! drives background tasks from the interface thread.

use clap::{Parser, Subcommand};

pub mod args;
pub mod batch;
pub mod commands;
pub mod observer;
pub mod prompt;
pub mod session;

/// Fetch remote streams, clip and join local media as background tasks
#[derive(Parser, Debug)]
#[command(name = "streamcut")]
#[command(about = "streamcut - fetch, clip and concatenate media as concurrent tasks")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: args::GlobalArgs,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report which tracks a media file has and how long it runs
    Probe(args::ProbeArgs),
    /// Download remote video or audio by link
    Fetch(args::FetchArgs),
    /// Cut a time range out of a local file
    Clip(args::ClipArgs),
    /// Join two trimmed files back to back
    Concat(args::ConcatArgs),
    /// Run a job file with several tasks at once
    Batch(args::BatchArgs),
    /// Remove intermediates left in the downloads directory
    Clean(args::CleanArgs),
    /// Show or create the config file
    Config(args::ConfigArgs),
}

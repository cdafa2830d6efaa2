//! streamcut command-line tool
//!
//! # Usage
//!
//! ```bash
//! streamcut probe talk.mp4
//! streamcut fetch --mode mp3 https://www.bilibili.com/video/BV1xx411c7mD
//! streamcut clip talk.mp4 --start 1:00 --end 1:30 --format with-audio
//! streamcut concat a.mp4 b.mp4 --first-end 5 --second-end 5
//! streamcut batch jobs.toml
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use streamcut::adapters::init_tracing;
use streamcut::cli::{commands, Cli};
use streamcut::config_initialization::{initialize_configuration, ConfigOverrides};

/// Main entry point
///
/// Stays synchronous: the blocking HTTP client is built here, and task
/// events are driven on a runtime created only for the session.
fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("cannot read the working directory")?;
    let loaded = initialize_configuration(
        cli.global.config.as_deref(),
        &working_dir,
        ConfigOverrides::from_args(&cli.global),
    )
    .context("failed to load configuration")?;

    init_tracing(loaded.config.log_level()?, cli.global.log_json)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting streamcut");
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => debug!("no config file, using defaults"),
    }

    let code = commands::execute(cli, loaded)?;
    debug!(?code, "streamcut finished");
    Ok(code)
}

//! Command implementations

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::adapters::toml_config::{AppConfig, TomlConfigAdapter, DEFAULT_CONFIG_FILE};
use crate::adapters::FfmpegAdapter;
use crate::app::{AppContainer, ClipDraft, ConcatDraft, DefaultAppContainer, RequestInteractor};
use crate::cli::args::*;
use crate::cli::batch::{BatchFile, BatchJob};
use crate::cli::observer::ConsoleObserver;
use crate::cli::prompt::TerminalPrompt;
use crate::cli::session::Session;
use crate::cli::{Cli, Commands};
use crate::config_initialization::LoadedConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{ClipIntent, FormatAnswer};
use crate::engine::{cleanup, event_channel, TaskRegistry};
use crate::probe::StreamProber;
use crate::ports::PromptPort;
use crate::utils::format_file_size;
use crate::utils::path::is_temp_name;
use crate::utils::time::TimeParser;

/// Exit code after the user chose to terminate running tasks
const EXIT_TERMINATED: u8 = 130;

/// Run the parsed command line.
pub fn execute(cli: Cli, loaded: LoadedConfig) -> Result<ExitCode> {
    let config = loaded.config;
    match cli.command {
        Commands::Config(args) => config_command(&config, loaded.source.as_deref(), args),
        Commands::Clean(args) => clean(&config, &args),
        Commands::Probe(args) => {
            let container = container(&config)?;
            probe(&container.prober(), &args)
        }
        Commands::Fetch(args) => {
            let container = container(&config)?;
            if container.fetch_interactor().is_none() {
                bail!("fetch needs a metadata source: set --resolver-url or --manifest-dir");
            }
            let mode = FetchMode::from(args.mode);
            let specs = args
                .urls
                .into_iter()
                .map(|url| TaskSpec::Fetch(FetchRequest { url, mode }))
                .collect();
            run_tasks(&config, container, specs, config.max_parallel, 0)
        }
        Commands::Clip(args) => {
            let container = container(&config)?;
            let requests = container.request_interactor(terminal_prompt());
            let draft = clip_draft(&args.input, &args.start, args.end.as_deref(), args.intent(), args.format)?;
            match requests.clip_spec(draft) {
                Ok(Some(spec)) => run_tasks(&config, container, vec![spec], 1, 0),
                Ok(None) => {
                    println!("Clip cancelled");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_rejected(TaskKind::Clip, e)),
            }
        }
        Commands::Concat(args) => {
            let container = container(&config)?;
            let requests = container.request_interactor(terminal_prompt());
            let draft = concat_draft(
                &args.first,
                (args.first_start.as_str(), args.first_end.as_str()),
                &args.second,
                (args.second_start.as_str(), args.second_end.as_str()),
                args.mode,
            )?;
            match requests.concat_spec(draft) {
                Ok(Some(spec)) => run_tasks(&config, container, vec![spec], 1, 0),
                Ok(None) => {
                    println!("Concat cancelled");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_rejected(TaskKind::Concat, e)),
            }
        }
        Commands::Batch(args) => {
            let container = container(&config)?;
            let file = BatchFile::load(&args.file).context("failed to read job file")?;
            let max_parallel = args
                .max_parallel
                .or(file.max_parallel)
                .unwrap_or(config.max_parallel);
            let requests = container.request_interactor(terminal_prompt());

            let mut specs = Vec::with_capacity(file.jobs.len());
            let mut rejected = 0;
            for job in file.jobs {
                let kind = job_kind(&job);
                match batch_spec(&requests, &container, job) {
                    Ok(Some(spec)) => specs.push(spec),
                    Ok(None) => info!(kind = %kind, "job dropped at the format question"),
                    Err(e) => {
                        report_rejected(kind, e);
                        rejected += 1;
                    }
                }
            }
            info!(jobs = specs.len(), rejected, max_parallel, "batch prepared");
            run_tasks(&config, container, specs, max_parallel, rejected)
        }
    }
}

fn container(config: &AppConfig) -> Result<Arc<DefaultAppContainer>> {
    let container = DefaultAppContainer::new(config).context("failed to set up adapters")?;
    Ok(Arc::new(container))
}

fn terminal_prompt() -> Arc<dyn PromptPort> {
    Arc::new(TerminalPrompt::stdin())
}

/// Print a request that never became a task the way a task failure reads.
fn report_rejected(kind: TaskKind, error: DomainError) -> ExitCode {
    if let Some(message) = Outcome::Failed(error).message(kind) {
        println!("{}", message);
    }
    ExitCode::FAILURE
}

fn clip_draft(
    input: &Path,
    start: &str,
    end: Option<&str>,
    intent: ClipIntent,
    format: Option<ClipFormatArg>,
) -> DomainResult<ClipDraft> {
    Ok(ClipDraft {
        source: input.to_path_buf(),
        start_seconds: TimeParser::parse_seconds(start)?,
        end_seconds: end.map(TimeParser::parse_seconds).transpose()?,
        intent,
        preset: format.map(FormatAnswer::from),
    })
}

fn concat_draft(
    first: &Path,
    (first_start, first_end): (&str, &str),
    second: &Path,
    (second_start, second_end): (&str, &str),
    mode: ConcatModeArg,
) -> DomainResult<ConcatDraft> {
    let first_range = TimeRange::new(
        TimeParser::parse_seconds(first_start)?,
        TimeParser::parse_seconds(first_end)?,
    )?;
    let second_range = TimeRange::new(
        TimeParser::parse_seconds(second_start)?,
        TimeParser::parse_seconds(second_end)?,
    )?;
    Ok(ConcatDraft {
        first: first.to_path_buf(),
        first_range,
        second: second.to_path_buf(),
        second_range,
        intent: mode.intent(),
        preset: mode.preset(),
    })
}

fn job_kind(job: &BatchJob) -> TaskKind {
    match job {
        BatchJob::Fetch { .. } => TaskKind::Fetch,
        BatchJob::Clip { .. } => TaskKind::Clip,
        BatchJob::Concat { .. } => TaskKind::Concat,
    }
}

fn batch_spec(
    requests: &RequestInteractor,
    container: &DefaultAppContainer,
    job: BatchJob,
) -> DomainResult<Option<TaskSpec>> {
    match job {
        BatchJob::Fetch { url, mode } => {
            if container.fetch_interactor().is_none() {
                return Err(DomainError::Config(
                    "no metadata source configured; set resolver_url or manifest_dir".to_string(),
                ));
            }
            Ok(Some(TaskSpec::Fetch(FetchRequest { url, mode: mode.into() })))
        }
        BatchJob::Clip {
            input,
            start,
            end,
            audio,
            format,
        } => {
            let intent = clip_intent(audio, format);
            requests.clip_spec(clip_draft(&input, &start, end.as_deref(), intent, format)?)
        }
        BatchJob::Concat {
            first,
            first_start,
            first_end,
            second,
            second_start,
            second_end,
            mode,
        } => requests.concat_spec(concat_draft(
            &first,
            (first_start.as_str(), first_end.as_str()),
            &second,
            (second_start.as_str(), second_end.as_str()),
            mode,
        )?),
    }
}

/// Submit `specs` and drive them to the end on a fresh event loop.
fn run_tasks(
    config: &AppConfig,
    container: Arc<DefaultAppContainer>,
    specs: Vec<TaskSpec>,
    max_parallel: usize,
    prior_failures: usize,
) -> Result<ExitCode> {
    if specs.is_empty() {
        return Ok(if prior_failures == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let needs_encoder = specs
        .iter()
        .any(|s| !matches!(s, TaskSpec::Fetch(FetchRequest { mode: FetchMode::Mp4, .. })));
    if needs_encoder && !FfmpegAdapter::new(&config.ffmpeg_path).is_available() {
        warn!(ffmpeg = %config.ffmpeg_path.display(), "ffmpeg could not be started; encoding steps will fail");
    }

    let (events_tx, events_rx) = event_channel();
    let registry = Arc::new(TaskRegistry::new(container, events_tx));
    registry.subscribe(Arc::new(ConsoleObserver::stdout()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the event loop")?;
    let session = Session::new(registry, events_rx, terminal_prompt(), specs, max_parallel);
    let summary = runtime.block_on(session.run());
    info!(?summary, "session finished");

    if summary.terminated {
        return Ok(ExitCode::from(EXIT_TERMINATED));
    }
    Ok(if summary.all_succeeded() && prior_failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    path: &'a Path,
    #[serde(flatten)]
    descriptor: StreamDescriptor,
}

/// Execute the probe command
pub fn probe(prober: &StreamProber, args: &ProbeArgs) -> Result<ExitCode> {
    let descriptor = prober
        .probe(&args.input)
        .with_context(|| format!("failed to probe {}", args.input.display()))?;

    if args.json {
        let report = ProbeReport {
            path: &args.input,
            descriptor,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("File:     {}", args.input.display());
    match descriptor.dimensions() {
        Some((w, h)) if descriptor.has_video => println!("Video:    yes ({}x{})", w, h),
        _ if descriptor.has_video => println!("Video:    yes"),
        _ => println!("Video:    no"),
    }
    println!("Audio:    {}", if descriptor.has_audio { "yes" } else { "no" });
    println!("Duration: {}", format_clock(descriptor.duration_seconds));
    Ok(ExitCode::SUCCESS)
}

/// Execute the clean command
pub fn clean(config: &AppConfig, args: &CleanArgs) -> Result<ExitCode> {
    let dir = config.resolved_downloads_dir()?;
    if !dir.is_dir() {
        println!("Nothing to clean: {} does not exist", dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let temps: Vec<(PathBuf, u64)> = WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_temp_name(entry.path()))
        .map(|entry| {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            (entry.into_path(), size)
        })
        .collect();

    if temps.is_empty() {
        println!("No intermediates in {}", dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    let total: u64 = temps.iter().map(|(_, size)| size).sum();
    if args.dry_run {
        for (path, size) in &temps {
            println!("would remove {} ({})", path.display(), format_file_size(*size));
        }
        println!("{} file(s), {}", temps.len(), format_file_size(total));
        return Ok(ExitCode::SUCCESS);
    }

    let report = cleanup::remove_all(temps.iter().map(|(path, _)| path));
    for path in &report.removed {
        println!("removed {}", path.display());
    }
    for (path, reason) in &report.failed {
        println!("could not remove {}: {}", path.display(), reason);
    }
    println!("{} file(s) removed, {} freed", report.removed.len(), format_file_size(total));
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute the config command
pub fn config_command(config: &AppConfig, source: Option<&Path>, args: ConfigArgs) -> Result<ExitCode> {
    match args.action {
        ConfigAction::Show => {
            match source {
                Some(path) => println!("# loaded from {}", path.display()),
                None => println!("# no config file; defaults and overrides only"),
            }
            print!("{}", TomlConfigAdapter::to_toml(config)?);
        }
        ConfigAction::Init { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() && !force {
                bail!("{} already exists; pass --force to replace it", path.display());
            }
            TomlConfigAdapter::save(&AppConfig::default(), &path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

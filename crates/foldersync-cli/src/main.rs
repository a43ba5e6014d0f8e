//! foldersync - keep a replica folder an exact mirror of a source folder
//!
//! Runs a pass every `INTERVAL` seconds until SIGINT/SIGTERM, or a single
//! pass with `--once`. Every action is appended to `LOG_FILE` and echoed on
//! the console.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use foldersync_audit::{ActionLog, NoticeFormat};
use foldersync_core::config::{Config, ConfigBuilder};
use foldersync_sync::{LocalFileSystemAdapter, RunSummary, SyncEngine, SyncScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod output;

use output::{get_formatter, OutputFormatter};

/// Exit status for configuration that failed validation
const EXIT_INVALID_CONFIG: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "foldersync",
    version,
    about = "One-way periodic folder synchronization"
)]
pub struct Cli {
    /// Folder to mirror (must exist)
    source: Option<PathBuf>,

    /// Folder kept identical to SOURCE (created if absent)
    replica: Option<PathBuf>,

    /// Append-only action log (parent directories are created)
    log_file: Option<PathBuf>,

    /// Seconds between the end of one pass and the start of the next
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Use alternate config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Emit live notices and diagnostics as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose diagnostics (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Diagnostic level override (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Config file named by `--config`, else the default location if present
    fn load_base_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display())),
            None => Ok(Config::load_or_default(&Config::default_path())),
        }
    }

    /// Layers command-line values over `base`
    fn apply_overrides(&self, base: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(base);

        if let Some(source) = &self.source {
            builder = builder.sync_source(source.clone());
        }
        if let Some(replica) = &self.replica {
            builder = builder.sync_replica(replica.clone());
        }
        if let Some(log_file) = &self.log_file {
            builder = builder.logging_file(log_file.clone());
        }
        if let Some(interval) = self.interval {
            builder = builder.sync_interval_secs(interval);
        }
        if let Some(level) = &self.log_level {
            builder = builder.logging_level(level.clone());
        }
        if self.json {
            builder = builder.logging_notice_format("json");
        }

        builder.build()
    }
}

/// Default diagnostic filter: `-v` and `-vv` win over the configured level
fn filter_directive(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(config: &Config, verbose: u8, json: bool) {
    let directive = filter_directive(&config.logging.level, verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    // stdout carries the live notices; diagnostics go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Waits for SIGINT or SIGTERM, then cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

/// Startup followed by the pass loop
async fn run(config: Config, once: bool) -> Result<RunSummary> {
    let notice_format: NoticeFormat = config
        .logging
        .notice_format
        .parse()
        .context("Invalid notice format")?;
    let log = ActionLog::standard(&config.logging.file, notice_format)
        .context("Failed to open action log")?;

    let engine = SyncEngine::from_config(&config, Arc::new(LocalFileSystemAdapter::new()), log);
    engine.prepare().await?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let mut scheduler = SyncScheduler::new(engine, config.sync.interval(), shutdown_token);
    if once {
        scheduler = scheduler.with_max_passes(1);
    }

    Ok(scheduler.run().await)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter: Box<dyn OutputFormatter> = get_formatter(cli.json);

    let config = match cli.load_base_config() {
        Ok(base) => cli.apply_overrides(base),
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    init_tracing(&config, cli.verbose, cli.json);

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            formatter.error(&problem.to_string());
        }
        return ExitCode::from(EXIT_INVALID_CONFIG);
    }

    info!(
        source = %config.sync.source.display(),
        replica = %config.sync.replica.display(),
        log_file = %config.logging.file.display(),
        interval_secs = config.sync.interval_secs,
        "foldersync starting"
    );

    match run(config, cli.once).await {
        Ok(summary) => {
            info!("foldersync shut down gracefully");
            formatter.summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "foldersync exiting with error");
            formatter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

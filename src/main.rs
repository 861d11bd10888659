//! idle-shutdownd - user daemon that shuts the machine down when left idle.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use idle_shutdownd::config::Config;
use idle_shutdownd::domain::Timings;
use idle_shutdownd::event_log::{self, EventLog, FileEventLog};
use idle_shutdownd::idle::{self, IdleBackend};
use idle_shutdownd::monitor::{Collaborators, IdleShutdownMachine, RunOutcome};
use idle_shutdownd::notify::{self, NotifierKind};
use idle_shutdownd::shutdown::{ClickPoint, SystemShutdown};

/// Idle shutdown daemon.
///
/// Warns after the configured idle time and powers off unless input resumes.
#[derive(Parser, Debug)]
#[command(name = "idle-shutdownd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the event log.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log the shutdown instead of executing it.
    #[arg(long)]
    dry_run: bool,

    /// Where idle time is read from.
    #[arg(long, value_enum, default_value_t = IdleBackend::Auto)]
    idle_backend: IdleBackend,

    /// How the shutdown warning is shown.
    #[arg(long, value_enum, default_value_t = NotifierKind::Desktop)]
    notifier: NotifierKind,

    /// Power-off command and its arguments (default: systemctl poweroff).
    #[arg(long, num_args = 1.., value_name = "ARG", allow_hyphen_values = true)]
    shutdown_command: Vec<String>,

    /// Screen point clicked after the shutdown command, as X,Y. Repeatable.
    #[arg(long, value_name = "X,Y")]
    fallback_click: Vec<ClickPoint>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level)?;

    let config = Config::load_or_default(args.config.as_deref());

    if args.print_config {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(());
    }

    info!("idle-shutdownd v{} starting", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let stop = CancellationToken::new();
    spawn_signal_handler(stop.clone())?;

    let parts = Collaborators {
        input: idle::monitor_for(args.idle_backend),
        notifier: notify::notifier_for(args.notifier).await,
        executor: Box::new(SystemShutdown::new(
            args.shutdown_command,
            args.fallback_click,
            args.dry_run,
        )),
        event_log: open_event_log(args.log_file),
    };

    let mut machine = IdleShutdownMachine::new(&config, Timings::default(), parts);

    match machine.run(&stop).await {
        RunOutcome::ShutdownCommitted => info!("Shutdown committed"),
        RunOutcome::Stopped => info!("Stopped before shutdown"),
    }

    Ok(())
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("idle_shutdownd={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

/// Cancel `stop` on SIGINT or SIGTERM.
fn spawn_signal_handler(stop: CancellationToken) -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
        stop.cancel();
    });

    Ok(())
}

/// Open the event log at the given or default path.
fn open_event_log(path: Option<PathBuf>) -> Box<dyn EventLog> {
    let path = path
        .or_else(event_log::default_path)
        .unwrap_or_else(|| {
            warn!("No data directory available, writing event log to ./log.txt");
            PathBuf::from("log.txt")
        });

    info!("Event log: {}", path.display());
    Box::new(FileEventLog::new(path))
}

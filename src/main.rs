use anyhow::Context;
use clap::Parser;
use mistwatch::config::AppConfig;
use mistwatch::cycle::{Mode, Monitor, run_daemon};
use mistwatch::history::SnapshotStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Which stages to run
    #[arg(short, long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Keep running cycles until interrupted
    #[arg(short, long)]
    daemon: bool,

    /// Seconds between daemon cycles, overrides daemon.interval_secs
    #[arg(short, long)]
    interval: Option<u64>,

    /// Print the stored history summary as JSON and exit
    #[arg(long)]
    history_summary: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_history_summary(config: &AppConfig) -> anyhow::Result<()> {
    let Some(root) = config.history.root() else {
        anyhow::bail!("history is disabled (history.directory is empty)");
    };
    let summary = SnapshotStore::new(root).summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.history_summary {
        print_history_summary(&config)?;
        return Ok(true);
    }

    info!(mode = ?args.mode, "starting mistwatch");
    let interval = Duration::from_secs(args.interval.unwrap_or(config.daemon.interval_secs));
    if interval.is_zero() {
        anyhow::bail!("--interval must be greater than 0");
    }
    let monitor = Monitor::connect(config)
        .await
        .context("initializing Mist API client")?;

    if args.daemon {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "unable to listen for ctrl-c");
                return;
            }
            info!("interrupt received, stopping after the current cycle");
            trigger.cancel();
        });
        run_daemon(&monitor, args.mode, interval, shutdown).await;
        return Ok(true);
    }

    let outcome = monitor.run_cycle(args.mode).await;
    if outcome.history_write_failed {
        error!("snapshot could not be written to history");
    }
    for e in &outcome.errors {
        error!(error = %e, "cycle error");
    }
    Ok(outcome.is_success())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(true) => {
            info!("mistwatch completed successfully");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("application error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

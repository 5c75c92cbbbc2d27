//! listwatch CLI
//!
//! Polls the configured listing pages and notifies about new entries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use listwatch::{
    error::Result,
    models::Config,
    pipeline::{self, CycleRunner},
    services::notifier::{self, READY_MESSAGE},
    storage::LocalStorage,
    utils::http::HttpFetcher,
};

/// listwatch - Marketplace Listing Poller
#[derive(Parser, Debug)]
#[command(
    name = "listwatch",
    version,
    about = "Polls listing pages and notifies about new entries"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "listwatch.toml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Send a readiness message at startup
    #[arg(long)]
    ready: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    log::info!("listwatch starting...");

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_process_env();
    config.validate()?;

    log::info!(
        "Watching {} target(s), every {}ms, history of {}",
        config.targets.len(),
        config.poller.poll_interval_ms,
        config.history.history_size
    );

    let fetcher = HttpFetcher::new(&config.poller)?;
    let storage = LocalStorage::new(&config.paths.data_dir);
    let notifier = notifier::from_config(&config.telegram, config.poller.timeout());

    if cli.ready {
        if let Err(e) = notifier.notify(READY_MESSAGE).await {
            log::warn!("Readiness message failed: {}", e);
        }
    }

    let runner = CycleRunner::new(&config, &fetcher, &storage, notifier.as_ref());

    if cli.once {
        let report = pipeline::run_once(&runner, &config.targets).await;
        log::info!("Done! {} new item(s)", report.added());
    } else {
        let cycles =
            pipeline::run_forever(&runner, &config.targets, config.poller.poll_interval()).await;
        log::info!("Stopped after {} cycle(s)", cycles);
    }

    Ok(())
}

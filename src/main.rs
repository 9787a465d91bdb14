use std::process::ExitCode;
use std::time::Duration;

use adbpull::cli::Cli;
use adbpull::config::{Config, config_dir};
use adbpull::transfer::{AdbPuller, Bridge, SourceSpec, run_pull};
use adbpull::util::print_summary;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("fatal: {:?}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let (req, opts) = cli.into_request(&config)?;

    let adb_path = cli.adb.clone().unwrap_or_else(|| config.adb_path.clone());
    // a dry run over list files never talks to the device
    let needs_bridge = !(opts.dry_run && matches!(req.sources, SourceSpec::ListFiles(_)));
    let bridge = if needs_bridge {
        Bridge::locate(&adb_path, cli.serial.clone())?
    } else {
        Bridge::new(adb_path, cli.serial.clone())
    }
    .with_listing_timeout(cli.listing_timeout(&config));
    let puller = AdbPuller::new(bridge.clone(), cli.keep_metadata(), cli.timeout(&config))
        .with_poll_interval(Duration::from_millis(config.poll_interval_ms.max(1)));

    let summary = run_pull(&req, &opts, &bridge, &puller)?;
    print_summary(&summary, &opts);
    Ok(())
}

/// Warnings (or `RUST_LOG`) to stderr; with `--verbose` also a debug log file
/// under `~/.adbpull/logs`. The returned guard flushes the file on drop.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let mut guard = None;
    let file_layer = if verbose {
        config_dir().map(|d| d.join("logs")).and_then(|logs| {
            if let Err(e) = std::fs::create_dir_all(&logs) {
                eprintln!("cannot create log dir {}: {}", logs.display(), e);
                return None;
            }
            let appender = tracing_appender::rolling::never(&logs, "adbpull.log");
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(fmt::layer().with_ansi(false).with_writer(writer).with_filter(LevelFilter::DEBUG))
        })
    } else {
        None
    };

    tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();
    guard
}

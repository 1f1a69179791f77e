// # cfddns - Cloudflare Dynamic DNS Updater
//
// Thin integration layer: parses the command line, sets up logging and the
// runtime, wires the Cloudflare client and the trace address source into the
// supervisor, and maps the outcome to an exit code. All reconciliation logic
// lives in cfddns-core.
//
// ## Usage
//
// ```bash
// cfddns /etc/cfddns/config.yaml            # one pass, then exit
// cfddns /etc/cfddns/config.yaml -i 300     # a pass every 5 minutes
// ```
//
// ## Environment
//
// - `CFDDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `CFDDNS_MODE`: `dry-run` to log writes instead of sending them
// - `CFDDNS_API_BASE`: Cloudflare API base URL override
// - `CFDDNS_TRACE_URL`: address echo endpoint override

mod cli;

use anyhow::Result;
use cfddns_core::{RunMode, Supervisor, SupervisorEvent};
use cfddns_ip_http::TraceIpSource;
use cfddns_provider_cloudflare::CloudflareFactory;
use clap::Parser;
use cli::Cli;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable selecting the log level
const LOG_LEVEL_ENV: &str = "CFDDNS_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// - 0: Single pass done, or shutdown by signal
/// - 1: Configuration, credentials, zone or (single-shot) address failure
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CfddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CfddnsExitCode> for ExitCode {
    fn from(code: CfddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match log_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CfddnsExitCode::RuntimeError.into();
    }

    info!("Starting cfddns {}", env!("CARGO_PKG_VERSION"));
    let mode = cli.run_mode();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CfddnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(cli.config, mode)).into()
}

/// Start the supervisor and run it to completion
async fn run(config_path: PathBuf, mode: RunMode) -> CfddnsExitCode {
    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("{}", e);
            return CfddnsExitCode::RuntimeError;
        }
    };

    let ip_source = match TraceIpSource::from_env() {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            return CfddnsExitCode::RuntimeError;
        }
    };
    info!("Resolving public address via {}", ip_source.url());

    supervise(
        config_path,
        mode,
        CloudflareFactory::from_env(),
        ip_source,
        shutdown,
    )
    .await
}

/// Run the supervisor until done or until `shutdown` resolves
///
/// The shutdown future is watched from the start, so a signal during
/// credential verification or the zone lookup ends the process cleanly.
async fn supervise(
    config_path: PathBuf,
    mode: RunMode,
    factory: CloudflareFactory,
    ip_source: TraceIpSource,
    shutdown: impl Future<Output = ()>,
) -> CfddnsExitCode {
    tokio::pin!(shutdown);

    let started = tokio::select! {
        started = Supervisor::start(config_path, Box::new(factory), Box::new(ip_source), mode) => started,
        _ = &mut shutdown => {
            info!("Shutdown during startup");
            return CfddnsExitCode::CleanShutdown;
        }
    };

    let (mut supervisor, events) = match started {
        Ok(started) => started,
        Err(e) => {
            error!("Startup failed: {}", e);
            return CfddnsExitCode::ConfigError;
        }
    };

    tokio::spawn(log_events(events));

    match supervisor.run_until(&mut shutdown).await {
        Ok(()) => CfddnsExitCode::CleanShutdown,
        Err(e) => {
            error!("Exiting: {}", e);
            CfddnsExitCode::ConfigError
        }
    }
}

/// Drain supervisor events into the debug log
async fn log_events(mut events: mpsc::Receiver<SupervisorEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Supervisor event: {:?}", event);
    }
}

/// Parse a log level name; unset means info
fn log_level(value: Option<&str>) -> Result<Level> {
    let Some(value) = value else {
        return Ok(Level::INFO);
    };

    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" | "" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_ENV,
            value
        ),
    }
}

/// Future resolving on SIGTERM or SIGINT
///
/// Handlers are installed before the supervisor starts so a signal during
/// the first pass is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("{} received, shutting down", name);
    })
}

/// Future resolving on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("SIGINT received, shutting down"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

//! Boot sequence: parse arguments, validate configuration, install logging,
//! run the watch session until a shutdown signal arrives.

use std::ffi::OsString;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use dropzone_config::WatchConfig;
use dropzone_events::EventBus;
use dropzone_telemetry::{LogFormat, LoggingConfig, Metrics, SessionContextGuard, build_sha};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::session::WatchSession;

const USAGE: &str = "usage: dropzone <watch_dir> <move|rename|none> <dest_dir> [extension]";

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    /// Shutdown was requested and every pipeline finished.
    Clean,
    /// Arguments or configuration were rejected before watching began.
    Usage,
    /// The directory subscription could not be established.
    WatchFailed,
}

impl AppExit {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Usage => 1,
            Self::WatchFailed => 2,
        }
    }
}

impl From<AppExit> for ExitCode {
    fn from(exit: AppExit) -> Self {
        Self::from(exit.code())
    }
}

/// Entry point for the binary: runs until Ctrl-C or SIGTERM.
pub async fn run_app<I, T>(args: I) -> AppExit
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    run_app_with(args, shutdown_signal()).await
}

/// Boot sequence with an injected shutdown future to simplify testing.
///
/// Logging is installed on a best-effort basis so repeated calls in one
/// process keep working.
pub async fn run_app_with<I, T, F>(args: I, shutdown: F) -> AppExit
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: Future<Output = ()>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => AppExit::Clean,
                _ => AppExit::Usage,
            };
        }
    };

    let format = match cli.log_format.as_deref() {
        Some(value) => match value.parse::<LogFormat>() {
            Ok(format) => format,
            Err(err) => {
                eprintln!("{err}");
                eprintln!("{USAGE}");
                return AppExit::Usage;
            }
        },
        None => LogFormat::infer(),
    };
    let level = cli.log_level.clone();

    let config = match WatchConfig::from_raw(cli.into_raw()) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            let err = AppError::config("config.from_raw", err);
            eprintln!("{}", error_detail(&err));
            eprintln!("{USAGE}");
            return err.exit_status();
        }
    };

    let logging = LoggingConfig {
        level: &level,
        format,
        build_sha: build_sha(),
    };
    if let Err(err) = dropzone_telemetry::init_logging(&logging) {
        // A subscriber is already installed (tests, embedding); keep using it.
        warn!(error = %err, "logging already initialised");
    }

    match run_session(config, shutdown).await {
        Ok(()) => AppExit::Clean,
        Err(err) => {
            error!(error = ?err, "watch session failed");
            eprintln!("{err}: {}", error_detail(&err));
            err.exit_status()
        }
    }
}

async fn run_session<F>(config: Arc<WatchConfig>, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    let _context = SessionContextGuard::new(&config.watch_directory, config.action.as_str());
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let events = EventBus::new();

    let session = WatchSession::start(Arc::clone(&config), events, metrics)?;
    info!(
        watch_dir = %config.watch_directory.display(),
        action = %config.action,
        destination = ?config.destination_directory,
        extension = ?config.extension_filter,
        settings = %serde_json::to_string(config.as_ref()).unwrap_or_default(),
        "watching for new files; press Ctrl-C to stop"
    );

    shutdown.await;
    info!("shutdown requested");

    let snapshot = session.shutdown().await?;
    info!(
        routed = snapshot.files_routed_total,
        coalesced = snapshot.events_coalesced_total,
        applied = snapshot.applied_total,
        skipped = snapshot.skipped_total,
        failed = snapshot.failed_total,
        gave_up = snapshot.gave_up_total,
        "dropzone stopped"
    );
    Ok(())
}

fn error_detail(err: &AppError) -> String {
    match err {
        AppError::Config { source, .. } => source.detail(),
        AppError::Telemetry { source, .. } => source.to_string(),
        AppError::Watch { path, source, .. } => format!("{}: {source}", path.display()),
        AppError::Join { operation, source } => format!("{operation}: {source}"),
        AppError::Io {
            path: Some(path),
            source,
            ..
        } => format!("{}: {source}", path.display()),
        AppError::Io { source, .. } => source.to_string(),
    }
}

/// Resolve when the process receives Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                let _ = stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

//! Logging setup: stderr plus a daily rolling file under `<root>/logs/`.
//!
//! `SKILLFORGE_DEBUG_LOG=1` forces debug level; otherwise `RUST_LOG` applies,
//! defaulting to `info`. If the log directory can't be created, logging falls
//! back to stderr only.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEBUG_LOG_ENV: &str = "SKILLFORGE_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "skillforge.log";

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(logs_dir: Option<&Path>) -> Option<WorkerGuard> {
    let file_writer = logs_dir.and_then(|dir| {
        fs_err::create_dir_all(dir).ok()?;
        Some(tracing_appender::non_blocking(tracing_appender::rolling::daily(
            dir,
            LOG_FILE_PREFIX,
        )))
    });

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match file_writer {
        Some((writer, guard)) => {
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .try_init();
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_LOG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

//! Dual-output logging: structured JSONL to a file, pretty text to stderr.
//!
//! The JSONL stream (one JSON object per line, under
//! `~/.shortcut-kit/logs/`) is meant for tooling; stderr stays readable for
//! humans. `RUST_LOG` overrides the default `info` filter.
//!
//! ```rust,ignore
//! // Keep the guard alive for the duration of the program.
//! let _guard = shortcut_kit::logging::init();
//! tracing::info!(event_type = "startup", "dispatcher ready");
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the non-blocking file writer alive. Dropping it flushes and closes
/// the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system. Call once, keep the guard.
pub fn init() -> LoggingGuard {
    let log_dir = log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[logging] failed to create log directory: {e}");
    }
    let path = log_dir.join("shortcut-kit.jsonl");

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // `fmt::Layer` is generic over the subscriber type, so each match arm
    // builds its own copy to let inference pick the right stack shape.
    macro_rules! pretty_layer {
        () => {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true)
                .with_level(true)
                .compact()
        };
    }

    match file {
        Some(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let json_layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::NONE);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .with(pretty_layer!())
                .init();
            tracing::info!(log_path = %path.display(), "logging initialized");
            LoggingGuard { _file_guard: guard }
        }
        None => {
            // Stderr-only fallback when the log file can't be opened.
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::sink());
            tracing_subscriber::registry()
                .with(env_filter)
                .with(pretty_layer!())
                .init();
            tracing::warn!(log_path = %path.display(), "log file unavailable, stderr only");
            LoggingGuard { _file_guard: guard }
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".shortcut-kit").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("shortcut-kit-logs"))
}

/// Path of the JSONL log file.
pub fn log_path() -> PathBuf {
    log_dir().join("shortcut-kit.jsonl")
}

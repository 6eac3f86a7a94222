use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, LogFormat};

/// Global crash log directory, set during init.
static CRASH_LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize tracing with a stderr layer and a daily-rolling file layer.
///
/// - Stderr: compact human-readable, or JSON when `GAIA_LOG_FORMAT=json`
/// - File: `<data_dir>/logs/gaia.log.YYYY-MM-DD`, no ANSI
/// - Default level: INFO (DEBUG for this crate), override via RUST_LOG env
///
/// The returned guard flushes the file writer on drop; hold it for the life of the process.
pub fn init(config: &AppConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gaia_pipeline=debug"));

    let (compact_layer, json_layer) = match config.log_format {
        LogFormat::Compact => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().with_writer(std::io::stderr).json()),
        ),
    };

    let log_dir = config.log_dir();
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, "gaia.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    // A second init (tests, embedding apps) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(compact_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init();

    if guard.is_none() {
        tracing::warn!(path = %log_dir.display(), "Log directory unavailable, file logging disabled");
    }
    tracing::debug!("Tracing initialized");
    guard
}

/// Install a panic hook that writes crash details to `<data_dir>/crash_logs` before unwinding.
pub fn install_crash_hook(data_dir: &Path) {
    let crash_dir = data_dir.join("crash_logs");
    let _ = std::fs::create_dir_all(&crash_dir);
    CRASH_LOG_DIR.set(crash_dir).ok();

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(dir) = CRASH_LOG_DIR.get() {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = dir.join(format!("crash_{}.log", timestamp));

            let mut report = format!(
                "=== GAIA PIPELINE CRASH REPORT ===\nTime: {}\nVersion: {}\n\n",
                chrono::Local::now().to_rfc3339(),
                env!("CARGO_PKG_VERSION"),
            );

            if let Some(msg) = info.payload().downcast_ref::<&str>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else if let Some(msg) = info.payload().downcast_ref::<String>() {
                report.push_str(&format!("Panic: {}\n", msg));
            } else {
                report.push_str("Panic: <unknown payload>\n");
            }

            if let Some(loc) = info.location() {
                report.push_str(&format!("Location: {}:{}:{}\n", loc.file(), loc.line(), loc.column()));
            }

            report.push_str(&format!(
                "\nBacktrace:\n{}\n",
                std::backtrace::Backtrace::force_capture()
            ));

            let _ = std::fs::write(&path, &report);
            eprintln!("[CRASH] Report written to: {}", path.display());
        }

        prev_hook(info);
    }));

    tracing::debug!("Crash hook installed");
}

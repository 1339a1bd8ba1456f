//! Logging setup. The interactive launcher owns the terminal, so it logs
//! to a file; one-shot commands log to stderr.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn filter(debug: bool) -> EnvFilter {
    let level = if debug || cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("sift={level}")))
}

pub fn setup_stderr_logging(debug: bool) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter(debug))
        .init();
}

/// Log to a timestamped file in `log_dir`. The returned guard flushes the
/// writer and must be held until exit.
pub fn setup_file_logging(debug: bool, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("sift-{timestamp}.log");

    #[cfg(unix)]
    {
        let symlink_path = log_dir.join("sift.log");
        let _ = std::fs::remove_file(&symlink_path);
        let _ = std::os::unix::fs::symlink(log_dir.join(&log_filename), &symlink_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, &log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter(debug))
        .init();

    Ok(guard)
}

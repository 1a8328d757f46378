//! Logging Infrastructure
//!
//! Structured logging with `EnvFilter`, optional JSON output and optional
//! daily rolling files.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("route_server={level},shared={level},tower_http={level},security={level}")
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over `level`. When `log_dir` exists, output goes to a daily
/// rolling file instead of stdout and the returned guard must be held until exit.
pub fn init_logger(level: &str, json: bool, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "route-server");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            return Some(guard);
        }
        // 目录不存在时退回 stdout
        eprintln!("LOG_DIR {dir} does not exist, logging to stdout");
    }

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    None
}

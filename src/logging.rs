use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "mirror_sync=info";
const DEFAULT_TRACE_FILE: &str = "./logs/mirror-sync.log";

/// Console diagnostics plus a plain-text copy in the trace file. The action
/// log written by `FileLogSink` is separate and unaffected by the filter.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter_layer = EnvFilter::new(filter);

    let trace_file =
        env::var("TRACE_FILE_PATH").unwrap_or_else(|_| DEFAULT_TRACE_FILE.to_string());
    let (directory, file_name) = split_trace_path(Path::new(&trace_file));

    let file_appender = tracing_appender::rolling::never(&directory, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(false)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    debug!(
        "Diagnostics mirrored to {}",
        directory.join(&file_name).display()
    );

    guard
}

/// Split a trace file path into the directory the appender writes in and the
/// file name. A bare file name lands in the working directory.
fn split_trace_path(path: &Path) -> (PathBuf, PathBuf) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mirror-sync.log"));
    (directory, file_name)
}

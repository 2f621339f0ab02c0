use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "warn";
const LOG_DIR: &str = "log";
const LOG_FILE_PREFIX: &str = "quotebook.log";

/// Installs the global subscriber: stderr always, plus a daily rolling file
/// under `<home>/log` when `log_to_file` is set.
///
/// The returned guard flushes the file writer on drop and must outlive every
/// log statement.
pub fn init(quotebook_home: &Path, log_to_file: bool) -> Option<WorkerGuard> {
    if tracing::dispatcher::has_been_set() {
        return None;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = if log_to_file {
        let appender = tracing_appender::rolling::daily(quotebook_home.join(LOG_DIR), LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    guard
}

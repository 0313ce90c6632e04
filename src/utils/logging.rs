use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "logs";

/// Installs the global subscriber for one run of a subcommand
///
/// Console output goes to stderr so it never interleaves with chat replies
/// on stdout. With `file_name` set, the same events are also written to a
/// daily rotating file under `logs/`, without colors.
pub fn init_logging(log_level: &str, file_name: Option<&str>) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using 'info'", log_level);
        EnvFilter::new("info")
    });

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .with_target(false);

    let file = file_name.map(|name| {
        fmt::layer()
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(RollingFileAppender::new(Rotation::DAILY, LOG_DIR, name))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}

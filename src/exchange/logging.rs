use std::fs;
use std::io;
use std::path::Path;

use tracing::dispatcher::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, registry};

use crate::exchange::config::{Config, Logging};
use crate::exchange::error::Result;
use crate::exchange::io::resolve_path;

// This is a helper struct to store the logger guards. When they are dropped, logging can be reset.
#[allow(dead_code)]
pub struct LogGuards {
    log_guard: Option<WorkerGuard>,
    default: DefaultGuard,
}

/// Console logging only. Stdout belongs to the greetings, so everything goes to stderr.
pub fn init_std_err_logging_thread_local() -> DefaultGuard {
    let collector = registry().with(
        fmt::Layer::new()
            .with_writer(io::stderr)
            .with_filter(LevelFilter::INFO),
    );
    tracing::subscriber::set_default(collector)
}

/// Installs the subscriber for process `rank` on the current thread. Keep the returned guards
/// alive until the process is done.
pub fn init_logging(config: &Config, rank: u32) -> Result<LogGuards> {
    let (log_layer, log_guard) = if Logging::Info == config.output.logging {
        let dir = resolve_path(config.context(), Path::new(&config.output.output_dir));
        fs::create_dir_all(&dir)?;

        let log_file_name = format!("log_process_{rank}.txt");
        let log_file_appender = rolling::never(&dir, log_file_name);
        let (log_file, log_guard) = non_blocking(log_file_appender);
        let layer = fmt::Layer::new()
            .with_writer(log_file)
            .json()
            .with_ansi(false)
            .with_filter(LevelFilter::INFO);
        (Some(layer), Some(log_guard))
    } else {
        (None, None)
    };

    let console_layer = (rank == 0).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_filter(LevelFilter::INFO)
    });

    // Add `Optional`s. If None, then the corresponding layer is not added.
    let collector = registry().with(log_layer).with(console_layer);
    let default = tracing::subscriber::set_default(collector);

    Ok(LogGuards { log_guard, default })
}

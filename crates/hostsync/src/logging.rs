//! Tracing setup: stderr always, plus a daily-rotated file when
//! `logging.directory` is configured.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use hostsync_config::Logging;

use crate::error::CliError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Filter precedence: `-v` flags, then `RUST_LOG`, then `default_level`.
/// The returned guard flushes the file writer and must live as long as
/// the process logs.
pub fn init(
    verbosity: u8,
    default_level: &str,
    logging: &Logging,
) -> Result<Option<WorkerGuard>, CliError> {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if logging.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    let mut guard = None;
    if let Some(ref dir) = logging.directory {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&logging.file_name)
            .build(dir)
            .map_err(|e| CliError::Logging {
                message: format!("{}: {e}", dir.display()),
            })?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        layers.push(if logging.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?;

    Ok(guard)
}

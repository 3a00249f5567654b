//! Logging initialization.
//!
//! Structured JSON lines go to a log file that other tools can tail; a
//! compact human-readable copy optionally goes to stderr. `RUST_LOG`
//! overrides the configured level for both.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Append-only log file writer that flushes after every write, so lines
/// from several processes interleave whole.
#[derive(Clone)]
pub struct FlushingWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl FlushingWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// * `level` - default level when `RUST_LOG` is unset
/// * `log_path` - JSON-lines file; `None` disables file output
/// * `also_stderr` - mirror events to stderr in compact form
///
/// Returns an error when the log file cannot be opened. Installing twice is
/// a no-op.
pub fn init_logging(level: &str, log_path: Option<&Path>, also_stderr: bool) -> io::Result<()> {
    let file_layer = match log_path {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(FlushingWriter::open(path)?)
                .with_filter(filter(level)),
        ),
        None => None,
    };

    let stderr_layer = also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .with_filter(filter(level))
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            log_path = ?log_path.map(|p| p.display().to_string()),
            "logging initialized"
        );
    }
    Ok(())
}

/// Parse a log level name; unknown names map to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

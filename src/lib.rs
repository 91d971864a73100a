pub mod config;
pub mod gateway;
pub mod mcp_client;
pub mod server;

use std::path::{Path, PathBuf};

use tracing_subscriber::fmt::writer::BoxMakeWriter;

use gateway::GatewayError;

/// Log file name inside the configured log directory.
pub const LOG_FILE_NAME: &str = "gateway.log";

/// Rotated copies kept next to the live log file.
const LOG_FILES_KEPT: u32 = 3;

/// Install the global tracing subscriber.
///
/// With `log_dir`, logs go to `<log_dir>/gateway.log` (rotated on every
/// start, flushed after every line); otherwise to stderr. `RUST_LOG`
/// overrides the default filter. Returns the log file path, if any.
pub fn init_tracing(log_dir: Option<&Path>, json: bool) -> Result<Option<PathBuf>, GatewayError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let (writer, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| GatewayError::ConfigError {
                reason: format!("failed to create log dir {}: {e}", dir.display()),
            })?;
            let log_path = dir.join(LOG_FILE_NAME);

            // Rotate: gateway.log.2 → .3, .1 → .2, gateway.log → .1
            rotate_log_file(&log_path, LOG_FILES_KEPT);

            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|e| GatewayError::ConfigError {
                    reason: format!("failed to open {}: {e}", log_path.display()),
                })?;
            (BoxMakeWriter::new(FlushingWriter::new(log_file)), Some(log_path))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_gateway=info,warn"));

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_path.is_none() && !json)
        .with_target(true)
        .with_thread_ids(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| GatewayError::ConfigError {
        reason: format!("failed to install tracing subscriber: {e}"),
    })?;

    Ok(log_path)
}

/// Shift `path.1 .. path.{keep-1}` up by one, dropping the oldest, and move
/// the current file to `path.1`.
fn rotate_log_file(base_path: &Path, keep: u32) {
    // Delete the oldest
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    // Shift: .{n-1} → .{n}
    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Current → .1
    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that flushes after every write, so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

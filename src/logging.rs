//! Logging setup for the dashboard.
//!
//! Installs a global tracing subscriber that writes to stdout and to an
//! in-memory [`DebugLog`] rendered by the debug panel.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Upper bound on retained debug output, in bytes.
const DEBUG_LOG_CAPACITY: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Shared buffer of formatted log lines. Oldest lines are dropped first.
#[derive(Clone, Debug, Default)]
pub struct DebugLog {
    buffer: Arc<Mutex<String>>,
}

impl DebugLog {
    pub fn snapshot(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear();
    }

    pub fn append(&self, text: &str) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|err| err.into_inner());
        buffer.push_str(text);
        if buffer.len() > DEBUG_LOG_CAPACITY {
            let excess = buffer.len() - DEBUG_LOG_CAPACITY;
            let cut = buffer.as_bytes()[excess..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|pos| excess + pos + 1)
                .unwrap_or(buffer.len());
            buffer.drain(..cut);
        }
    }
}

pub struct DebugLogWriter {
    log: DebugLog,
}

impl io::Write for DebugLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.append(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DebugLog {
    type Writer = DebugLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DebugLogWriter { log: self.clone() }
    }
}

/// Initialize tracing to write to stdout and the debug panel buffer.
pub fn init(debug_log: DebugLog) -> Result<(), LoggingError> {
    let stdout_layer = fmt::layer().with_writer(io::stdout);
    let panel_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(debug_log);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stdout_layer)
        .with(panel_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;

    tracing::info!("Logging initialized");
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

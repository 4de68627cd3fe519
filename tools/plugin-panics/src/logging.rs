use crate::errors::PanicsError;
use crate::log_retention::enforce_total_budget;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), PanicsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PanicsError::Io(e.to_string()))?;
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| PanicsError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PanicsError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| PanicsError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            let _ = enforce_total_budget(parent, self.budget_bytes)?;
        }

        Ok(())
    }
}

static RUN_LOGGER: OnceLock<Mutex<Option<JsonlLogger>>> = OnceLock::new();

fn run_logger_slot() -> &'static Mutex<Option<JsonlLogger>> {
    RUN_LOGGER.get_or_init(|| Mutex::new(None))
}

/// Route `append_run_log` events to `logger` until `clear_run_logger`.
pub fn init_run_logger(logger: JsonlLogger) {
    *run_logger_slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(logger);
}

pub fn clear_run_logger() {
    *run_logger_slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// Best-effort structured log line. A no-op until a run logger is installed;
/// write failures are dropped so diagnostics never take down panic capture.
pub fn append_run_log(level: &str, event_type: &str, payload: Value) {
    let logger = run_logger_slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(logger) = logger {
        let _ = logger.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

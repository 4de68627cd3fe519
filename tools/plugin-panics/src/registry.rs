use crate::logging::append_run_log;
use crate::recorder::{PanicCapture, PanicRecorder};
use crate::template::DEFAULT_MAX_LINES;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Write handle for one plugin's recorder. Clones write into the same
/// recorder, so one sink per captured stream is fine.
#[derive(Debug, Clone)]
pub struct PanicSink {
    recorder: Arc<PanicRecorder>,
}

impl PanicSink {
    pub fn record(&self, line: &str) {
        self.recorder.record(line);
    }

    pub fn plugin(&self) -> &str {
        self.recorder.plugin()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    order: Vec<Arc<PanicRecorder>>,
    by_plugin: HashMap<String, usize>,
}

/// Directory of per-plugin recorders. Owned by the host and handed to both the
/// output pumps (via `register_plugin`) and the crash reporter (via
/// `snapshot`).
#[derive(Debug)]
pub struct PanicRegistry {
    max_lines: usize,
    state: Mutex<RegistryState>,
}

impl Default for PanicRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl PanicRegistry {
    /// `max_lines` below one is raised to one.
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn register_plugin(&self, plugin: &str) -> PanicSink {
        let mut state = self.lock();
        if let Some(idx) = state.by_plugin.get(plugin).copied() {
            return PanicSink {
                recorder: Arc::clone(&state.order[idx]),
            };
        }

        let recorder = Arc::new(PanicRecorder::new(plugin, self.max_lines));
        let idx = state.order.len();
        state.order.push(Arc::clone(&recorder));
        state.by_plugin.insert(plugin.to_string(), idx);
        drop(state);

        append_run_log(
            "debug",
            "panics.plugin.registered",
            json!({
                "plugin": plugin,
                "max_lines": self.max_lines,
            }),
        );
        PanicSink { recorder }
    }

    /// Structured copies of every recorder holding output, in registration
    /// order.
    pub fn captures(&self) -> Vec<PanicCapture> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter_map(|recorder| recorder.capture())
            .collect()
    }

    /// Rendered reports for every plugin that recorded at least one line.
    /// Reading does not clear anything.
    pub fn snapshot(&self) -> Vec<String> {
        self.captures()
            .iter()
            .map(PanicCapture::render)
            .collect()
    }

    pub fn plugins(&self) -> Vec<String> {
        self.lock()
            .order
            .iter()
            .map(|recorder| recorder.plugin().to_string())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Bounded per-plugin accumulator for panic output.
//!
//! A recorder keeps the first half of its capacity verbatim (the panic message
//! and the innermost frames) and a rolling window over the most recent lines
//! for the other half. Everything in between is counted and replaced by a
//! single marker line when rendered, so a plugin that dumps thousands of
//! goroutine stacks costs at most `max_lines` retained lines.

use crate::logging::append_run_log;
use crate::template::{omission_marker, render_plugin_panic};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Point-in-time copy of one recorder's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanicCapture {
    pub plugin: String,
    pub head: Vec<String>,
    pub omitted: u64,
    pub tail: Vec<String>,
}

impl PanicCapture {
    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }

    /// Retained lines in order, with the omission marker between head and
    /// tail when anything was dropped.
    pub fn body_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.head.len() + self.tail.len() + 1);
        lines.extend(self.head.iter().cloned());
        if self.is_truncated() {
            lines.push(omission_marker(self.omitted));
        }
        lines.extend(self.tail.iter().cloned());
        lines
    }

    pub fn render(&self) -> String {
        render_plugin_panic(&self.plugin, &self.body_lines().join("\n"))
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    head: Vec<String>,
    tail: VecDeque<String>,
    omitted: u64,
}

#[derive(Debug)]
pub struct PanicRecorder {
    plugin: String,
    head_cap: usize,
    tail_cap: usize,
    state: Mutex<RecorderState>,
}

impl PanicRecorder {
    /// A cap of zero is raised to one. The head always gets at least one slot
    /// so the panic header survives any amount of later output.
    pub fn new(plugin: impl Into<String>, max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        let head_cap = (max_lines / 2).max(1);
        Self {
            plugin: plugin.into(),
            head_cap,
            tail_cap: max_lines - head_cap,
            state: Mutex::new(RecorderState::default()),
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn max_lines(&self) -> usize {
        self.head_cap + self.tail_cap
    }

    pub fn record(&self, line: &str) {
        let started_truncating = {
            let mut state = self.lock();
            if state.head.len() < self.head_cap {
                state.head.push(line.to_string());
                false
            } else {
                state.tail.push_back(line.to_string());
                if state.tail.len() > self.tail_cap {
                    state.tail.pop_front();
                    state.omitted += 1;
                    state.omitted == 1
                } else {
                    false
                }
            }
        };
        if started_truncating {
            append_run_log(
                "info",
                "panics.recorder.truncating",
                json!({
                    "plugin": self.plugin,
                    "max_lines": self.max_lines(),
                }),
            );
        }
    }

    pub fn capture(&self) -> Option<PanicCapture> {
        let state = self.lock();
        if state.head.is_empty() && state.tail.is_empty() {
            return None;
        }
        Some(PanicCapture {
            plugin: self.plugin.clone(),
            head: state.head.clone(),
            omitted: state.omitted,
            tail: state.tail.iter().cloned().collect(),
        })
    }

    /// Empty string when nothing was recorded.
    pub fn render(&self) -> String {
        self.capture()
            .map(|capture| capture.render())
            .unwrap_or_default()
    }

    pub fn line_count(&self) -> usize {
        let state = self.lock();
        state.head.len() + state.tail.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.lock().omitted > 0
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    // A writer that panicked mid-record leaves at worst one line missing;
    // capture must keep working for the other streams.
    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

use crate::logging::append_run_log;
use crate::registry::PanicSink;
use serde_json::json;

const PANIC_HEADERS: [&str; 2] = ["panic: ", "fatal error: "];

pub fn is_panic_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    PANIC_HEADERS
        .iter()
        .any(|header| trimmed.starts_with(header))
}

/// Watches one plugin output stream and forwards it to the plugin's recorder
/// from the first panic header onward. Earlier lines are ordinary plugin
/// logging and are not captured.
#[derive(Debug)]
pub struct PanicMonitor {
    sink: PanicSink,
    in_panic: bool,
}

impl PanicMonitor {
    pub fn new(sink: PanicSink) -> Self {
        Self {
            sink,
            in_panic: false,
        }
    }

    pub fn in_panic(&self) -> bool {
        self.in_panic
    }

    /// Returns true when `line` was recorded.
    pub fn observe(&mut self, line: &str) -> bool {
        if !self.in_panic {
            if !is_panic_header(line) {
                return false;
            }
            self.in_panic = true;
            append_run_log(
                "warn",
                "panics.monitor.panic_detected",
                json!({
                    "plugin": self.sink.plugin(),
                    "header": line,
                }),
            );
        }
        self.sink.record(line);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{is_panic_header, PanicMonitor};
    use crate::registry::PanicRegistry;

    #[test]
    fn recognizes_go_panic_and_runtime_fatal_headers() {
        assert!(is_panic_header("panic: runtime error: invalid memory address"));
        assert!(is_panic_header("fatal error: concurrent map writes"));
        assert!(is_panic_header("   panic: indented"));
        assert!(!is_panic_header("2024/01/01 [INFO] plugin started"));
        assert!(!is_panic_header("no panic: here"));
        assert!(!is_panic_header("panic:missing-space"));
    }

    #[test]
    fn ignores_lines_before_the_header_and_keeps_everything_after() {
        let registry = PanicRegistry::new(20);
        let mut monitor = PanicMonitor::new(registry.register_plugin("google"));

        assert!(!monitor.observe("[INFO] configuring provider"));
        assert!(!monitor.in_panic());
        assert!(monitor.observe("panic: boom"));
        assert!(monitor.observe(""));
        assert!(monitor.observe("goroutine 1 [running]:"));

        let captures = registry.captures();
        assert_eq!(captures.len(), 1);
        assert_eq!(
            captures[0].head,
            vec!["panic: boom", "", "goroutine 1 [running]:"]
        );
    }

    #[test]
    fn clean_stream_records_nothing() {
        let registry = PanicRegistry::new(20);
        let mut monitor = PanicMonitor::new(registry.register_plugin("quiet"));
        for line in ["starting", "serving", "shutting down"] {
            monitor.observe(line);
        }
        assert!(registry.snapshot().is_empty());
    }
}

use crate::errors::PanicsError;
use crate::logging::append_run_log;
use crate::runtime::FileSystem;
use serde_json::json;
use std::path::Path;

/// Joins per-plugin reports into the document appended to the host's crash
/// output. Empty when no plugin panicked.
pub fn compose_crash_report(reports: &[String]) -> String {
    reports
        .iter()
        .map(|report| report.trim_end_matches('\n'))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Writes the composed report to `path`. Nothing is written when `reports` is
/// empty; returns whether a file was produced.
pub fn write_crash_report(
    fs: &dyn FileSystem,
    path: &Path,
    reports: &[String],
) -> Result<bool, PanicsError> {
    if reports.is_empty() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs.create_dir_all(parent)?;
    }
    let mut text = compose_crash_report(reports);
    text.push('\n');
    fs.write_string(path, &text)?;
    append_run_log(
        "info",
        "panics.report.written",
        json!({
            "path": path.display().to_string(),
            "reports": reports.len(),
        }),
    );
    Ok(true)
}

use crate::errors::PanicsError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOG_EXTENSION: &str = "jsonl";

/// Deletes the oldest run logs in `dir` until the remaining `*.jsonl` files fit
/// in `budget_bytes`. Crash reports and other files sharing the directory are
/// never touched.
pub fn enforce_total_budget(dir: &Path, budget_bytes: u64) -> Result<Vec<PathBuf>, PanicsError> {
    let mut logs = fs::read_dir(dir)
        .map_err(|e| PanicsError::Io(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_run_log(path))
        .filter_map(|path| {
            let meta = fs::metadata(&path).ok()?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((path, modified, meta.len()))
        })
        .collect::<Vec<_>>();

    let mut total = logs.iter().map(|(_, _, len)| *len).sum::<u64>();
    if total <= budget_bytes {
        return Ok(Vec::new());
    }

    logs.sort_by(|a, b| a.1.cmp(&b.1));

    let mut deleted = Vec::new();
    for (path, _, len) in logs {
        if total <= budget_bytes {
            break;
        }
        fs::remove_file(&path).map_err(|e| PanicsError::Io(e.to_string()))?;
        total = total.saturating_sub(len);
        deleted.push(path);
    }

    Ok(deleted)
}

fn is_run_log(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(LOG_EXTENSION)
}

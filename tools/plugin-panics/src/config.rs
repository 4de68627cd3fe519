use crate::errors::PanicsError;
use crate::logging::{DEFAULT_DISK_BUDGET_BYTES, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::runtime::FileSystem;
use crate::template::DEFAULT_MAX_LINES;
use crate::types::ReportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureConfig {
    pub max_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    pub path: Option<PathBuf>,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                max_lines: DEFAULT_MAX_LINES,
            },
            report: ReportConfig {
                path: None,
                format: ReportFormat::Text,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
                budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    capture: Option<PartialCaptureConfig>,
    report: Option<PartialReportConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialCaptureConfig {
    max_lines: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialReportConfig {
    path: Option<PathBuf>,
    format: Option<ReportFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

/// Defaults, then the config file, then CLI flags. Relative paths resolve
/// against `process_cwd`.
pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<AppConfig, PanicsError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(&absolutize_path(process_cwd, path))?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| PanicsError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);

    cfg.report.path = cfg
        .report
        .path
        .map(|path| absolutize_path(process_cwd, &path));
    cfg.logging.path = cfg
        .logging
        .path
        .map(|path| absolutize_path(process_cwd, &path));

    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(capture) = partial.capture {
        if let Some(max_lines) = capture.max_lines {
            cfg.capture.max_lines = max_lines;
        }
    }

    if let Some(report) = partial.report {
        if let Some(path) = report.path {
            cfg.report.path = Some(path);
        }
        if let Some(format) = report.format {
            cfg.report.format = format;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(path) = &overrides.report_path {
        cfg.report.path = Some(path.clone());
    }
    if let Some(format) = overrides.format {
        cfg.report.format = format;
    }
    if let Some(path) = &overrides.log_file {
        cfg.logging.path = Some(path.clone());
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), PanicsError> {
    if cfg.capture.max_lines == 0 {
        return Err(PanicsError::InvalidConfig(
            "capture.max_lines must be greater than zero".to_string(),
        ));
    }
    if cfg.logging.max_payload_bytes < 16 {
        return Err(PanicsError::InvalidConfig(
            "logging.max_payload_bytes must be at least 16".to_string(),
        ));
    }
    if cfg.logging.budget_bytes == 0 {
        return Err(PanicsError::InvalidConfig(
            "logging.budget_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

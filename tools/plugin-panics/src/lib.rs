pub mod config;
pub mod errors;
pub mod log_retention;
pub mod logging;
pub mod monitor;
pub mod recorder;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod template;
pub mod types;

use clap::{error::ErrorKind, Parser, ValueEnum};
use config::{load_config, AppConfig, CliOverrides};
use errors::PanicsError;
use logging::{append_run_log, clear_run_logger, init_run_logger, JsonlLogger};
use monitor::PanicMonitor;
use registry::PanicRegistry;
use report::write_crash_report;
use runtime::ProductionRuntime;
use serde_json::json;
use types::{PluginCapture, ReportFormat};

#[derive(Debug, Clone, Parser)]
#[command(name = "plugin-panics")]
#[command(about = "Collect plugin panic output into a bounded crash report")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Captured plugin output; repeat the same NAME for interleaved streams.
    #[arg(long = "plugin", value_name = "NAME=PATH")]
    pub plugins: Vec<String>,
    #[arg(long)]
    pub report: Option<std::path::PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<CliFormat>,
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for ReportFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Text => ReportFormat::Text,
            CliFormat::Json => ReportFormat::Json,
        }
    }
}

pub fn run() -> Result<i32, PanicsError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| PanicsError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &std::path::Path,
    runtime: &ProductionRuntime,
) -> Result<i32, PanicsError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(PanicsError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        report_path: cli.report.clone(),
        format: cli.format.map(Into::into),
        log_file: cli.log_file.clone(),
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;
    let captures = cli
        .plugins
        .iter()
        .map(|value| PluginCapture::parse_cli(value))
        .collect::<Result<Vec<_>, _>>()?;

    let logging_enabled = cfg.logging.path.is_some();
    if let Some(path) = &cfg.logging.path {
        let mut logger = JsonlLogger::new(path);
        logger.max_payload_bytes = cfg.logging.max_payload_bytes;
        logger.budget_bytes = cfg.logging.budget_bytes;
        init_run_logger(logger);
    }

    let registry = PanicRegistry::new(cfg.capture.max_lines);
    let result = pump_captures(runtime, cwd, &registry, &captures)
        .and_then(|()| emit_reports(runtime, &cfg, &registry));
    if logging_enabled {
        clear_run_logger();
    }
    result?;
    Ok(0)
}

/// Opens every capture up front, then streams each through its own monitor
/// on a dedicated thread. Sinks are registered here, in command-line order, so
/// the report order does not depend on thread scheduling.
fn pump_captures(
    runtime: &ProductionRuntime,
    cwd: &std::path::Path,
    registry: &PanicRegistry,
    captures: &[PluginCapture],
) -> Result<(), PanicsError> {
    let mut streams = Vec::with_capacity(captures.len());
    for capture in captures {
        let path = if capture.path.is_absolute() {
            capture.path.clone()
        } else {
            cwd.join(&capture.path)
        };
        let reader = runtime.file_system.open_read(&path)?;
        streams.push((registry.register_plugin(&capture.plugin), path, reader));
    }

    std::thread::scope(|scope| {
        for (sink, path, mut reader) in streams {
            scope.spawn(move || {
                let plugin = sink.plugin().to_string();
                let mut monitor = PanicMonitor::new(sink);
                if let Err(error) = pump_stream(reader.as_mut(), &mut monitor) {
                    append_run_log(
                        "warn",
                        "panics.capture.read_failed",
                        json!({
                            "plugin": plugin,
                            "path": path.display().to_string(),
                            "error": error.to_string(),
                        }),
                    );
                }
            });
        }
    });
    Ok(())
}

/// Feeds `reader` line by line. Bytes that are not UTF-8 are replaced rather
/// than rejected; a crashing plugin does not get to pick its encoding.
fn pump_stream(
    reader: &mut dyn std::io::BufRead,
    monitor: &mut PanicMonitor,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let decoded = String::from_utf8_lossy(&buf);
        let decoded = decoded.as_ref();
        let line = decoded.strip_suffix('\n').unwrap_or(decoded);
        let line = line.strip_suffix('\r').unwrap_or(line);
        monitor.observe(line);
    }
}

fn emit_reports(
    runtime: &ProductionRuntime,
    cfg: &AppConfig,
    registry: &PanicRegistry,
) -> Result<(), PanicsError> {
    let captures = registry.captures();
    match cfg.report.format {
        ReportFormat::Text => {
            if captures.is_empty() {
                runtime.terminal.write_line("no plugin panics recorded")?;
            }
            for capture in &captures {
                runtime
                    .terminal
                    .write_line(capture.render().trim_end_matches('\n'))?;
            }
        }
        ReportFormat::Json => {
            let text = serde_json::to_string_pretty(&captures)
                .map_err(|e| PanicsError::Io(format!("report encode failed: {e}")))?;
            runtime.terminal.write_line(&text)?;
        }
    }

    if let Some(path) = &cfg.report.path {
        let reports = captures.iter().map(|c| c.render()).collect::<Vec<_>>();
        write_crash_report(runtime.file_system.as_ref(), path, &reports)?;
    }

    append_run_log(
        "info",
        "panics.run.complete",
        json!({
            "plugins": registry.plugins(),
            "panicked": captures.iter().map(|c| c.plugin.as_str()).collect::<Vec<_>>(),
            "truncated": captures.iter().filter(|c| c.is_truncated()).count(),
            "format": cfg.report.format.as_str(),
        }),
    );
    Ok(())
}

use crate::errors::PanicsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// One plugin output capture handed to the host: `NAME=PATH` on the command
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCapture {
    pub plugin: String,
    pub path: PathBuf,
}

impl PluginCapture {
    pub fn parse_cli(value: &str) -> Result<Self, PanicsError> {
        let (plugin, path) = value.split_once('=').ok_or_else(|| {
            PanicsError::Cli(format!("--plugin expects NAME=PATH, got `{value}`"))
        })?;
        let plugin = plugin.trim();
        if plugin.is_empty() || path.is_empty() {
            return Err(PanicsError::Cli(format!(
                "--plugin expects NAME=PATH, got `{value}`"
            )));
        }
        Ok(Self {
            plugin: plugin.to_string(),
            path: PathBuf::from(path),
        })
    }
}

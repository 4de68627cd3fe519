use thiserror::Error;

/// Failures of the ambient layers around the recorder. Recording and
/// snapshotting themselves never produce one of these.
#[derive(Debug, Error)]
pub enum PanicsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
}

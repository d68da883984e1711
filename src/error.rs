use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    #[error("Cannot read configuration {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration value for '{key}': {value:?}")]
    InvalidConfigValue { key: String, value: Option<String> },

    #[error("Invalid dimension '{name}': lower bound {lower} exceeds upper bound {upper}")]
    InvalidDimension { name: String, lower: f64, upper: f64 },

    #[error("Failed to launch engine {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine exited with {status}: {stderr}")]
    Execution { status: ExitStatus, stderr: String },

    #[error("Metric parse error: {0}")]
    MetricParse(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("Cannot install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TunerError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IsoError {
    #[error("computation aborted")]
    Aborted,

    #[error("unsupported transport mode: {0}")]
    TransportUnsupported(String),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("time threshold too low: no point within 1000 m is reachable in {mode} mode")]
    ThresholdTooLow { mode: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("missing required configuration field: {field}")]
    MissingConfig { field: String },
}

pub type Result<T> = std::result::Result<T, IsoError>;

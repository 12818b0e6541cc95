use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid value for `{name}`: {value}. Must be in the interval {interval}.")]
    OutOfRange {
        name: &'static str,
        value: f64,
        interval: String,
    },
    #[error("Invalid value for `{name}`: {value}. Must be positive.")]
    NonPositive { name: &'static str, value: f64 },
    #[error("Invalid decay schedule: {0}")]
    InvalidDecay(String),
    #[error("Invalid maze: {0}")]
    InvalidMaze(String),
    #[error("Corrupt action-value table: {0}")]
    CorruptTable(String),
    #[error("Table I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Table (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

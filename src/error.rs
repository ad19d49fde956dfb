//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, HTTP, and CSV errors, and provides semantic
//! variants for configuration validation and data-shape failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Metadata record error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("A maximum of two tiles can be processed, got {count}")]
    TooManyTiles { count: usize },

    #[error(
        "{dataset} needs an even observation count for 16-day aggregation, got {observations}"
    )]
    OddObservations {
        dataset: String,
        observations: usize,
    },

    #[error("Subset selector has {got} entries, {dataset} carries {expected} bands")]
    InvalidSubset {
        dataset: String,
        got: usize,
        expected: usize,
    },

    #[error("Expected {expected} rows, got {got} ({context})")]
    ShapeMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    #[error("Column manifest lists {names} names but the matrix has {columns} columns")]
    ColumnMismatch { names: usize, columns: usize },

    #[error("Column not found: {name}")]
    MissingColumn { name: String },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Training proportion {achieved:.3} outside tolerance {tolerance} of target {target}")]
    SplitOutOfTolerance {
        target: f64,
        achieved: f64,
        tolerance: f64,
    },

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}

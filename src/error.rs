use std::path::PathBuf;

use thiserror::Error;

/// Wrong number of command-line arguments.
#[derive(Debug, Error)]
#[error("Usage: {program} <input_file.csv>")]
pub struct UsageError {
    pub program: String,
}

/// Anything that stops the input table from being loaded or summarised.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected JSON layout: {0}")]
    JsonShape(String),

    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': '{value}' is not a number")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: core count '{digits}' does not fit in a 64-bit integer")]
    CoresOutOfRange { row: usize, digits: String },
}

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while reading issue records. None of them are recovered
/// locally; the sample stream ends after yielding one.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv input: {0}")]
    Csv(#[from] csv::Error),

    /// A row without both a title (column 1) and a body (column 2).
    #[error("row at line {line} has {fields} field(s), expected at least 3")]
    ShortRow { line: u64, fields: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("problem {0:?} is already registered")]
    Duplicate(String),

    #[error("no problem registered under {0:?}")]
    Unknown(String),
}

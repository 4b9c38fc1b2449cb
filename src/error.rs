use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleGrepError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to process file '{path}': {source}")]
    FileProcessing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("The provided log folder doesn't exist: {0}")]
    MissingLogDirectory(PathBuf),

    #[error("The provided log folder was empty: {0}")]
    EmptyLogDirectory(PathBuf),

    #[error("Cache cannot be created with capacity {0}, it must be at least 1")]
    InvalidCapacity(usize),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Pattern has no capture group named '{0}'")]
    UnknownGroup(String),

    #[error("Group '{group}' captured '{value}', which is not an integer")]
    InvalidNumber { group: String, value: String },

    #[error("Sum of counted values overflowed at position {index}")]
    CountOverflow { index: usize },

    #[error("Row has {actual} cells but the header has {expected}")]
    RowWidth { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("An unexpected error occurred: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BundleGrepError>;

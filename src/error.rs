use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Callheat operations
#[derive(Error, Debug)]
pub enum CallheatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error in {path}:{line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    /// No function definitions were extracted from any analyzed file
    #[error("No functions found: the call graph is empty")]
    EmptyGraph,

    #[error("Invalid focus predicate: {0}")]
    InvalidFocus(String),
}

pub type Result<T> = std::result::Result<T, CallheatError>;

use thiserror::Error;

/// Errors raised inside the core. Only the run-level ones ever reach a
/// caller, and then only as the structure's error string.
#[derive(Error, Debug)]
pub enum RolemapError {
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("directory path must not be empty")]
    EmptyPath,

    #[error("analysis cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("criteria store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, RolemapError>;

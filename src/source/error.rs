//! Custom error types for the source-loading module.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes.")]
    FileTooLarge { limit: u64, found: u64 },

    #[error("An underlying I/O error occurred.")]
    StdIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;

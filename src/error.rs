use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
///
/// Every variant corresponds to one [`ErrorCode`]; use [`Error::code`] when only the
/// category matters (e.g. in tests or when mapping to an exit status).
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required argument: {0}")]
    NullArgument(String),
    #[error("allocation failed: {0}")]
    AllocFailed(String),
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read model: {0}")]
    FileRead(#[source] io::Error),
    #[error("failed to write model: {0}")]
    FileWrite(#[source] io::Error),
    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fieldless error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NullArgument,
    AllocFailed,
    InvalidParam,
    InvalidArchitecture,
    InvalidDimensions,
    IndexOutOfBounds,
    FileOpen,
    FileRead,
    FileWrite,
    InvalidFileFormat,
}

impl ErrorCode {
    /// Fixed human-readable description of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NullArgument => "a required argument was missing",
            ErrorCode::AllocFailed => "memory allocation failed",
            ErrorCode::InvalidParam => "invalid parameter provided to a function",
            ErrorCode::InvalidArchitecture => "invalid neural network architecture",
            ErrorCode::InvalidDimensions => "mismatched matrix or vector dimensions",
            ErrorCode::IndexOutOfBounds => "index is out of bounds",
            ErrorCode::FileOpen => "failed to open file",
            ErrorCode::FileRead => "failed to read from file",
            ErrorCode::FileWrite => "failed to write to file",
            ErrorCode::InvalidFileFormat => "invalid or corrupted file format",
        }
    }
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NullArgument(_) => ErrorCode::NullArgument,
            Error::AllocFailed(_) => ErrorCode::AllocFailed,
            Error::InvalidParam(_) => ErrorCode::InvalidParam,
            Error::InvalidArchitecture(_) => ErrorCode::InvalidArchitecture,
            Error::InvalidDimensions(_) => ErrorCode::InvalidDimensions,
            Error::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
            Error::FileOpen { .. } => ErrorCode::FileOpen,
            Error::FileRead(_) => ErrorCode::FileRead,
            Error::FileWrite(_) => ErrorCode::FileWrite,
            Error::InvalidFileFormat(_) => ErrorCode::InvalidFileFormat,
        }
    }
}

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImffsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Out of space: no free blocks available")]
    OutOfSpace,

    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: u64, actual: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage inconsistency: {0}")]
    Corruption(String),

    #[error("Block already allocated: {0}")]
    BlockAlreadyAllocated(u64),

    #[error("Invalid block count: {0} (must be positive)")]
    InvalidBlockCount(usize),

    #[error("Invalid block ID: {0}")]
    InvalidBlockId(u64),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Fatal allocation failure: {0}")]
    Fatal(String),

    #[error("Feature not implemented: {0}")]
    NotImplemented(String),
}

pub type Result<T> = std::result::Result<T, ImffsError>;

/// Coarse outcome class of an operation
///
/// Every error maps onto exactly one code, so callers that only care about
/// the class of failure can match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    /// Operation-specific failure: not found, out of space, partial I/O
    Error,
    /// Precondition violated before any state was touched
    Invalid,
    /// Unrecoverable allocation failure during creation
    Fatal,
    NotImplemented,
}

impl ResultCode {
    pub fn of<T>(result: &Result<T>) -> ResultCode {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => e.code(),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultCode::Ok => "OK",
            ResultCode::Error => "ERROR",
            ResultCode::Invalid => "INVALID",
            ResultCode::Fatal => "FATAL",
            ResultCode::NotImplemented => "NOT_IMPLEMENTED",
        };
        f.write_str(s)
    }
}

impl ImffsError {
    pub fn code(&self) -> ResultCode {
        match self {
            ImffsError::NotFound(_)
            | ImffsError::AlreadyExists(_)
            | ImffsError::OutOfSpace
            | ImffsError::ShortWrite { .. }
            | ImffsError::Io(_)
            | ImffsError::Corruption(_)
            | ImffsError::BlockAlreadyAllocated(_) => ResultCode::Error,
            ImffsError::InvalidBlockCount(_)
            | ImffsError::InvalidBlockId(_)
            | ImffsError::InvalidName(_)
            | ImffsError::InvalidConfig(_)
            | ImffsError::InvalidCommand(_) => ResultCode::Invalid,
            ImffsError::Fatal(_) => ResultCode::Fatal,
            ImffsError::NotImplemented(_) => ResultCode::NotImplemented,
        }
    }
}

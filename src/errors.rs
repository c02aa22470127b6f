use thiserror::Error;

/// Errors produced while resolving and decoding the power directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("unsupported {table} version 0x{version:x}")]
    UnsupportedVersion { table: &'static str, version: u8 },

    #[error("no known table at directory slot 0x{slot:02x}")]
    NotFound { slot: u16 },

    #[error("table at 0x{offset:x} needs {needed} bytes but only {length} are available")]
    TruncatedTable {
        offset: usize,
        needed: usize,
        length: usize,
    },

    #[error("read of {width} bytes at 0x{offset:x} is past the end of the image ({len} bytes)")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
}

pub type PowerResult<T> = Result<T, PowerError>;

/// Errors surfaced by the command-line tool.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Power(#[from] PowerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage: {0}")]
    Usage(String),
}

pub type AppResult<T> = Result<T, AppError>;

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors raised while probing, parsing or assembling a model.
#[derive(Error, Debug)]
pub enum Error {
    #[error("file not valid")]
    Invalid,
    #[error("unknown file magic")]
    Ident,
    #[error("unsupported file version {0}")]
    Version(i32),
    #[error("file too small or truncated")]
    Size,
    #[error("out of memory")]
    Memory(#[from] TryReserveError),
    #[error("{message} (line {line})")]
    Parse { line: usize, message: String },
    #[error("failed loading {0}")]
    FileLoad(String),
    #[error("no filename given")]
    NoFileName,
    #[error("input stream is empty")]
    EmptyStream,
    #[error("no module recognized {0}")]
    Unrecognized(String),
    #[error("frame {frame} out of range ({frames} frames)")]
    InvalidFrame { frame: usize, frames: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Public result codes returned by module probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    ErrorIdent,
    ErrorVersion,
    ErrorSize,
    ErrorMemory,
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Error::Ident => Status::ErrorIdent,
            Error::Version(_) => Status::ErrorVersion,
            Error::Size => Status::ErrorSize,
            Error::Memory(_) => Status::ErrorMemory,
            _ => Status::Error,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => err.status(),
        }
    }
}

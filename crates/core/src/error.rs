// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for rotation, retention and writers

use std::io;
use std::path::PathBuf;
use thiserror::Error;

const CLOSED_PIPE: &str = "closed pipe";
const WRITE_TIMEOUT: &str = "write timeout";

/// Errors raised while building or operating rotating writers
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("file producer required")]
    MissingProducer,
    #[error("file producer yields an empty file path")]
    EmptyFilePath,
    #[error("filename prefix required")]
    PrefixRequired,
    #[error("rule {0:?} not supported")]
    RuleNotSupported(String),
    #[error("rule {0:?} already exists")]
    RuleExists(String),
    #[error("scheduler already started")]
    AlreadyStarted,
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("{op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RotateError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        RotateError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Error returned when writing through a writer that has been closed
pub fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, CLOSED_PIPE)
}

/// Error returned when a timed write could not be queued in time
pub fn write_timeout() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, WRITE_TIMEOUT)
}

/// Whether the error reports a write against a closed writer
pub fn is_closed(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

/// Whether the error reports a dropped write due to backpressure
pub fn is_write_timeout(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::TimedOut
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

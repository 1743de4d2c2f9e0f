// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::io;

/// Errors reported by the adapter itself.
///
/// Session I/O errors are never wrapped in this type; they are forwarded to
/// the caller as the `io::Error` the session produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyError {
    /// `start` was called on a session without a PTY.
    NotInteractive,
    /// An operation that needs a running adapter was called before `start`.
    NotStarted,
    /// `start` was called more than once.
    AlreadyStarted,
    /// `stop` was called more than once.
    AlreadyStopped,
    /// `drain` was called more than once.
    AlreadyDrained,
    /// The injection queue is gone (reader dropped).
    Closed,
    /// The injection slot is occupied.
    Busy,
    /// `start` was called outside a tokio runtime.
    NoRuntime,
}

impl TtyError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInteractive => "NOT_INTERACTIVE",
            Self::NotStarted => "NOT_STARTED",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::AlreadyStopped => "ALREADY_STOPPED",
            Self::AlreadyDrained => "ALREADY_DRAINED",
            Self::Closed => "CLOSED",
            Self::Busy => "BUSY",
            Self::NoRuntime => "NO_RUNTIME",
        }
    }

    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::NotInteractive => io::ErrorKind::Unsupported,
            Self::NotStarted => io::ErrorKind::NotConnected,
            Self::AlreadyStarted | Self::AlreadyStopped | Self::AlreadyDrained => {
                io::ErrorKind::AlreadyExists
            }
            Self::Closed => io::ErrorKind::BrokenPipe,
            Self::Busy => io::ErrorKind::WouldBlock,
            Self::NoRuntime => io::ErrorKind::Other,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::NotInteractive => "session is not interactive",
            Self::NotStarted => "tty has not been started",
            Self::AlreadyStarted => "tty already started",
            Self::AlreadyStopped => "tty already stopped",
            Self::AlreadyDrained => "tty already drained",
            Self::Closed => "injection queue closed",
            Self::Busy => "injection slot occupied",
            Self::NoRuntime => "no tokio runtime available",
        }
    }
}

impl fmt::Display for TtyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for TtyError {}

impl From<TtyError> for io::Error {
    fn from(err: TtyError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session abstraction: the blocking byte stream and PTY request that a
//! remote (or local) interactive session hands to the adapter.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::window::WindowSize;

/// PTY request accepted for a session.
#[derive(Debug)]
pub struct Pty {
    /// Terminal type requested by the client (e.g. `xterm-256color`).
    pub term: String,
    /// Dimensions at the time the PTY was requested.
    pub window: WindowSize,
    /// Window-change notifications, in arrival order.
    pub resize_rx: mpsc::Receiver<WindowSize>,
}

/// Byte-stream side of an interactive session.
///
/// `read` is blocking and may not return until the peer sends data or the
/// session is torn down; callers run it off the async runtime. An `Ok(0)`
/// read means the session reached end of stream.
///
/// Object-safe for use as `Arc<dyn Session>`.
pub trait Session: Send + Sync + 'static {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    fn close(&self) -> io::Result<()>;

    /// Returns the PTY request, or `None` when the session is not
    /// interactive.
    ///
    /// The resize receiver can only be handed out once; later calls return
    /// `None`.
    fn pty(&self) -> Option<Pty>;
}

impl<S: Session + ?Sized> Session for Arc<S> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn pty(&self) -> Option<Pty> {
        (**self).pty()
    }
}

impl Session for Box<dyn Session> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn pty(&self) -> Option<Pty> {
        (**self).pty()
    }
}

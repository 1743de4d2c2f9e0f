// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session over the process's own stdin/stdout.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::termios;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::{Pty, Session};
use crate::window::WindowSize;

const DEFAULT_TERM: &str = "xterm-256color";
const DEFAULT_SIZE: WindowSize = WindowSize { width: 80, height: 24 };

/// The controlling terminal as a [`Session`].
///
/// Reports a PTY only when stdin is a terminal, and only to the first caller.
#[derive(Debug, Default)]
pub struct LocalSession {
    pty_taken: AtomicBool,
}

impl LocalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminal() -> bool {
        rustix::termios::isatty(io::stdin())
    }
}

impl Session for LocalSession {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        let n = out.write(buf)?;
        out.flush()?;
        Ok(n)
    }

    fn close(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }

    fn pty(&self) -> Option<Pty> {
        if !Self::is_terminal() || self.pty_taken.swap(true, Ordering::SeqCst) {
            return None;
        }

        let window = terminal_size().unwrap_or(DEFAULT_SIZE);
        let term = std::env::var("TERM").unwrap_or_else(|_| DEFAULT_TERM.to_owned());

        let (tx, resize_rx) = mpsc::channel(8);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(forward_window_changes(tx));
            }
            Err(_) => warn!("no runtime, window changes will not be reported"),
        }

        Some(Pty { term, window, resize_rx })
    }
}

/// Current size of the terminal on stdout, if it is one.
pub fn terminal_size() -> Option<WindowSize> {
    let ws = rustix::termios::tcgetwinsize(io::stdout()).ok()?;
    if ws.ws_col > 0 && ws.ws_row > 0 {
        Some(WindowSize::new(ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

/// Turn SIGWINCH into window-size events until the receiver goes away.
async fn forward_window_changes(tx: mpsc::Sender<WindowSize>) {
    let mut sigwinch = match signal(SignalKind::window_change()) {
        Ok(s) => s,
        Err(e) => {
            warn!("cannot listen for SIGWINCH: {e}");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            got = sigwinch.recv() => {
                if got.is_none() {
                    break;
                }
                let Some(size) = terminal_size() else { continue };
                if tx.send(size).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("window change forwarding stopped");
}

/// RAII guard that puts stdin in raw mode and restores the original
/// attributes on drop.
pub struct RawModeGuard {
    original: termios::Termios,
}

impl RawModeGuard {
    pub fn enter() -> anyhow::Result<Self> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&stdin, termios::SetArg::TCSAFLUSH, &raw)?;
        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(io::stdin(), termios::SetArg::TCSAFLUSH, &self.original);
    }
}

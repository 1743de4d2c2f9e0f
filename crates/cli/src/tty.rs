// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY-style adapter over an interactive [`Session`].
//!
//! Terminal toolkits expect a tty: blocking single-byte reads that can be
//! cut short on shutdown, a window size, and a resize hook. [`TtyAdapter`]
//! provides that on top of any session byte stream.
//!
//! Lifecycle: `new` → `start` (queries the PTY, spawns the resize listener)
//! → `drain` (reads return `Ok(0)`) and `stop` (listener exits, in-flight
//! bytes are re-queued) → drop. `close` never touches the session; its
//! lifetime belongs to whoever accepted it.

use std::io;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TtyError;
use crate::interleave::{Injector, InterleavedReader, Outcome};
use crate::session::Session;
use crate::window::{ResizeCallback, WindowSize, WindowState};

/// One-shot lifecycle signals created by `start`.
#[derive(Debug, Clone)]
struct Signals {
    stop: CancellationToken,
    drain: CancellationToken,
}

/// Terminal adapter exposing PTY semantics over a session byte stream.
pub struct TtyAdapter<S: Session> {
    reader: Arc<InterleavedReader<S>>,
    window: Arc<WindowState>,
    signals: Mutex<Option<Signals>>,
    term: OnceLock<String>,
}

impl<S: Session> TtyAdapter<S> {
    pub fn new(session: S) -> Self {
        Self::from_arc(Arc::new(session))
    }

    pub fn from_arc(session: Arc<S>) -> Self {
        Self {
            reader: Arc::new(InterleavedReader::new(session)),
            window: Arc::new(WindowState::default()),
            signals: Mutex::new(None),
            term: OnceLock::new(),
        }
    }

    pub fn session(&self) -> &Arc<S> {
        self.reader.session()
    }

    /// Query the PTY, record the initial window size, and spawn the resize
    /// listener.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`TtyError::NotInteractive`] when the session has no PTY, in which case
    /// nothing is spawned and the adapter stays unusable.
    pub fn start(&self) -> Result<(), TtyError> {
        let mut signals = self.signals.lock();
        if signals.is_some() {
            return Err(TtyError::AlreadyStarted);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TtyError::NoRuntime)?;

        let Some(pty) = self.session().pty() else {
            warn!("session has no pty");
            return Err(TtyError::NotInteractive);
        };

        self.window.reset(pty.window);

        let stop = CancellationToken::new();
        runtime.spawn(watch_resize(pty.resize_rx, Arc::clone(&self.window), stop.clone()));

        let drain = CancellationToken::new();

        info!(term = %pty.term, size = %pty.window, "tty started");
        let _ = self.term.set(pty.term);
        *signals = Some(Signals { stop, drain });
        Ok(())
    }

    /// Terminate the resize listener. Bytes read from the session after this
    /// point are re-queued instead of delivered by a forward in flight, and
    /// no new session read is started.
    pub fn stop(&self) -> Result<(), TtyError> {
        let signals = self.signals.lock();
        let signals = signals.as_ref().ok_or(TtyError::NotStarted)?;
        if signals.stop.is_cancelled() {
            return Err(TtyError::AlreadyStopped);
        }
        signals.stop.cancel();
        info!("tty stopped");
        Ok(())
    }

    /// Make every blocked and future `read` return `Ok(0)`.
    pub fn drain(&self) -> Result<(), TtyError> {
        let signals = self.signals.lock();
        let signals = signals.as_ref().ok_or(TtyError::NotStarted)?;
        if signals.drain.is_cancelled() {
            return Err(TtyError::AlreadyDrained);
        }
        signals.drain.cancel();
        info!("tty drained");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.signals.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.signals.lock().as_ref().is_some_and(|s| s.stop.is_cancelled())
    }

    pub fn is_drained(&self) -> bool {
        self.signals.lock().as_ref().is_some_and(|s| s.drain.is_cancelled())
    }

    /// Terminal type from the PTY request.
    pub fn term(&self) -> Result<&str, TtyError> {
        self.term.get().map(String::as_str).ok_or(TtyError::NotStarted)
    }

    fn current(&self) -> Result<Signals, TtyError> {
        self.signals.lock().clone().ok_or(TtyError::NotStarted)
    }

    /// Read at most one byte.
    ///
    /// Returns `Ok(1)` with a session or injected byte, `Ok(0)` once drained
    /// (or for an empty `buf`), the session's error unchanged, or
    /// `UnexpectedEof` when the session stream ended. `Ok(0)` never means end
    /// of stream here.
    ///
    /// Dropping the returned future is safe: a byte that was already pulled
    /// from the session is kept for the next call.
    pub async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let signals = self.current()?;
        if buf.is_empty() || signals.drain.is_cancelled() {
            return Ok(0);
        }

        if !signals.stop.is_cancelled() {
            let mut delivery = self.reader.spawn_forward(signals.stop.clone());
            tokio::select! {
                outcome = &mut delivery => match outcome {
                    Outcome::Delivered(result) => return fill(buf, result),
                    Outcome::Eof => return Err(end_of_stream()),
                    // Stopped mid-delivery; the byte went to the put-back
                    // buffer and is served below.
                    Outcome::Requeued => {}
                },
                _ = signals.drain.cancelled() => {
                    // A byte handed over in the same instant still counts.
                    return match delivery.recover() {
                        Some(result) => fill(buf, result),
                        None => Ok(0),
                    };
                }
            }
        }

        tokio::select! {
            result = self.reader.next_queued() => match result {
                Some(result) => fill(buf, result),
                None => Err(end_of_stream()),
            },
            _ = signals.drain.cancelled() => Ok(0),
        }
    }

    /// Pass-through to the session's write.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.session().write(buf)
    }

    /// No-op: the session's lifetime is owned by the caller.
    pub fn close(&self) -> io::Result<()> {
        Ok(())
    }

    /// Splice a synthetic byte into the read path.
    pub async fn interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.reader.interleave(byte).await
    }

    pub fn try_interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.reader.try_interleave(byte)
    }

    pub fn injector(&self) -> Injector {
        self.reader.injector()
    }

    /// Last known window size. Never performs I/O.
    pub fn window_size(&self) -> Result<WindowSize, TtyError> {
        if !self.is_started() {
            return Err(TtyError::NotStarted);
        }
        Ok(self.window.size())
    }

    /// Register the resize callback, discarding any previous one.
    pub fn notify_resize(&self, callback: impl Fn(WindowSize) + Send + Sync + 'static) {
        let callback: ResizeCallback = Arc::new(callback);
        if self.window.set_callback(Some(callback)) {
            debug!("resize callback replaced");
        }
    }

    pub fn clear_resize(&self) {
        self.window.set_callback(None);
    }
}

impl<S: Session> Drop for TtyAdapter<S> {
    fn drop(&mut self) {
        if let Some(signals) = self.signals.get_mut().as_ref() {
            signals.stop.cancel();
        }
    }
}

impl<S: Session> std::fmt::Debug for TtyAdapter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyAdapter")
            .field("window", &self.window)
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .field("drained", &self.is_drained())
            .finish()
    }
}

/// Apply window-change events until `stop` fires or the channel closes.
async fn watch_resize(
    mut resize_rx: mpsc::Receiver<WindowSize>,
    window: Arc<WindowState>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            event = resize_rx.recv() => match event {
                Some(size) => {
                    debug!(%size, "window resized");
                    window.resize(size);
                }
                None => {
                    debug!("resize channel closed");
                    break;
                }
            },
        }
    }
}

fn fill(buf: &mut [u8], result: io::Result<u8>) -> io::Result<usize> {
    buf[0] = result?;
    Ok(1)
}

fn end_of_stream() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "session stream ended")
}

#[cfg(test)]
#[path = "tty_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte reader that interleaves synthetic input with a session's stream.
//!
//! Each call yields exactly one byte from whichever source is ready first:
//!
//! - a single blocking session read, run on the blocking pool and parked in
//!   a one-slot handoff until someone collects it;
//! - the injection queue, which accepts bytes from [`Injector`] handles;
//! - the put-back buffer, holding bytes that were already pulled from the
//!   session but whose delivery was cancelled.
//!
//! Put-back bytes always win, so a cancelled delivery is replayed before
//! anything newer. A parked session read is never abandoned: if an injected
//! byte wins the race, the read stays in its slot for the next call. At most
//! one session read is in flight per reader.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::TtyError;
use crate::session::Session;

/// Result slot for one blocking session read. Dropped without a value when
/// the session reached end of stream.
type PendingRead = oneshot::Receiver<io::Result<u8>>;

/// How a forwarded read finished.
#[derive(Debug)]
pub enum Outcome {
    /// A byte or the session's error, handed to the caller.
    Delivered(io::Result<u8>),
    /// The byte arrived after stop and sits in the put-back buffer.
    Requeued,
    /// The session reached end of stream.
    Eof,
}

/// Cloneable handle for splicing bytes into a reader's stream.
#[derive(Debug, Clone)]
pub struct Injector {
    tx: mpsc::Sender<u8>,
}

impl Injector {
    /// Queue one byte, waiting while the single injection slot is occupied.
    pub async fn interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.tx.send(byte).await.map_err(|_| TtyError::Closed)
    }

    /// Queue one byte without waiting.
    pub fn try_interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.tx.try_send(byte).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TtyError::Busy,
            mpsc::error::TrySendError::Closed(_) => TtyError::Closed,
        })
    }

    /// Queue each byte in order.
    pub async fn interleave_all(&self, bytes: &[u8]) -> Result<(), TtyError> {
        for &byte in bytes {
            self.interleave(byte).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PutBack {
    bytes: parking_lot::Mutex<VecDeque<u8>>,
    notify: Notify,
}

impl PutBack {
    fn push(&self, byte: u8) {
        self.bytes.lock().push_back(byte);
        self.notify.notify_waiters();
    }

    fn pop(&self) -> Option<u8> {
        self.bytes.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.bytes.lock().len()
    }
}

struct Slots {
    injected: mpsc::Receiver<u8>,
    pending: Option<PendingRead>,
}

/// Interleaves injected bytes with a [`Session`]'s blocking byte stream.
pub struct InterleavedReader<S> {
    session: Arc<S>,
    injector: Injector,
    putback: Arc<PutBack>,
    slots: Mutex<Slots>,
}

impl<S: Session> InterleavedReader<S> {
    pub fn new(session: Arc<S>) -> Self {
        let (tx, injected) = mpsc::channel(1);
        Self {
            session,
            injector: Injector { tx },
            putback: Arc::new(PutBack::default()),
            slots: Mutex::new(Slots { injected, pending: None }),
        }
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn injector(&self) -> Injector {
        self.injector.clone()
    }

    pub async fn interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.injector.interleave(byte).await
    }

    pub fn try_interleave(&self, byte: u8) -> Result<(), TtyError> {
        self.injector.try_interleave(byte)
    }

    /// Number of cancelled deliveries waiting to be replayed.
    pub fn requeued(&self) -> usize {
        self.putback.len()
    }

    /// Next byte from any source, starting a session read if none is in
    /// flight.
    ///
    /// Returns `None` when the session reports end of stream, and
    /// `Some(Err(_))` with the session's error unchanged.
    pub async fn next(&self) -> Option<io::Result<u8>> {
        let mut slots = self.slots.lock().await;
        self.next_locked(&mut slots, true).await
    }

    /// Next byte from the put-back buffer, the injection queue, or a session
    /// read already in flight. Never starts a new session read.
    pub async fn next_queued(&self) -> Option<io::Result<u8>> {
        let mut slots = self.slots.lock().await;
        self.next_locked(&mut slots, false).await
    }

    async fn next_locked(&self, slots: &mut Slots, spawn: bool) -> Option<io::Result<u8>> {
        let Slots { injected, pending } = slots;
        loop {
            // Register before checking so a push between the check and the
            // select still wakes us.
            let notified = self.putback.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(byte) = self.putback.pop() {
                return Some(Ok(byte));
            }
            if spawn && pending.is_none() {
                *pending = Some(spawn_session_read(Arc::clone(&self.session)));
            }

            tokio::select! {
                result = settle(pending) => return result,
                Some(byte) = injected.recv() => return Some(Ok(byte)),
                () = &mut notified => {}
            }
        }
    }

    /// Start a detached task that reads one byte and hands it to the
    /// returned [`Delivery`].
    ///
    /// If `stop` is cancelled by the time the byte arrives, or the delivery
    /// has been dropped, the byte goes to the put-back buffer instead.
    /// Errors are handed over as-is and never put back; one nobody is left
    /// to receive is logged and discarded.
    pub fn spawn_forward(self: &Arc<Self>, stop: CancellationToken) -> Delivery {
        let (tx, rx) = oneshot::channel();
        let reader = Arc::clone(self);
        tokio::spawn(async move { reader.forward(tx, stop).await });
        Delivery { rx, putback: Arc::clone(&self.putback) }
    }

    async fn forward(&self, mut tx: oneshot::Sender<Outcome>, stop: CancellationToken) {
        let next = async {
            let mut slots = self.slots.lock().await;
            self.next_locked(&mut slots, true).await
        };
        let result = tokio::select! {
            result = next => result,
            // Receiver gone before anything arrived: any in-flight session
            // read stays parked in its slot.
            () = tx.closed() => {
                trace!("forward abandoned before delivery");
                return;
            }
        };

        let outcome = match result {
            None => Outcome::Eof,
            Some(Ok(byte)) if stop.is_cancelled() => {
                debug!(byte, "stopped during delivery, byte re-queued");
                self.putback.push(byte);
                Outcome::Requeued
            }
            Some(result) => Outcome::Delivered(result),
        };
        match tx.send(outcome) {
            Err(Outcome::Delivered(Ok(byte))) => {
                debug!(byte, "reader gone during delivery, byte re-queued");
                self.putback.push(byte);
            }
            Err(Outcome::Delivered(Err(e))) => {
                debug!(error = %e, "reader gone during delivery, session error dropped");
            }
            Err(_) | Ok(()) => {}
        }
    }
}

/// Await the parked session read, clearing the slot once it settles.
/// Pending forever when nothing is parked.
async fn settle(pending: &mut Option<PendingRead>) -> Option<io::Result<u8>> {
    let result = match pending.as_mut() {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    };
    *pending = None;
    result
}

fn spawn_session_read<S: Session>(session: Arc<S>) -> PendingRead {
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 1];
        let result = match session.read(&mut buf) {
            Ok(0) => {
                trace!("session reached end of stream");
                return;
            }
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(e),
        };
        if tx.send(result).is_err() {
            trace!("session read finished after reader was dropped");
        }
    });
    rx
}

/// Receiving end of one forwarded byte.
///
/// Resolves to the forward's [`Outcome`]. Dropping a delivery that already
/// holds a byte moves the byte to the put-back buffer.
pub struct Delivery {
    rx: oneshot::Receiver<Outcome>,
    putback: Arc<PutBack>,
}

impl Delivery {
    /// Close the delivery and take the byte or error handed over so far.
    pub fn recover(&mut self) -> Option<io::Result<u8>> {
        self.rx.close();
        match self.rx.try_recv() {
            Ok(Outcome::Delivered(result)) => Some(result),
            _ => None,
        }
    }
}

impl Future for Delivery {
    type Output = Outcome;

    // A forward that vanished without reporting (runtime shutdown) counts
    // as end of stream.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.unwrap_or(Outcome::Eof))
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.rx.close();
        match self.rx.try_recv() {
            Ok(Outcome::Delivered(Ok(byte))) => {
                debug!(byte, "delivery dropped unread, byte re-queued");
                self.putback.push(byte);
            }
            Ok(Outcome::Delivered(Err(e))) => {
                debug!(error = %e, "delivery dropped unread, session error discarded");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "interleave_tests.rs"]
mod tests;

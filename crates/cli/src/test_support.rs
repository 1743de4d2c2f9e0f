// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scripted session and polling helpers.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::session::{Pty, Session};
use crate::window::WindowSize;

/// One scripted outcome for a blocking session read.
#[derive(Debug)]
pub enum Chunk {
    Byte(u8),
    Fail(io::ErrorKind),
    Eof,
}

/// Session whose reads are fed from a [`MockFeed`].
///
/// `read` blocks until the feed sends something. Dropping the feed makes
/// every later read return end of stream, which also releases any blocking
/// read still parked at the end of a test.
pub struct MockSession {
    chunks: parking_lot::Mutex<std_mpsc::Receiver<Chunk>>,
    pty: parking_lot::Mutex<Option<Pty>>,
    written: parking_lot::Mutex<Vec<u8>>,
    reads_started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed: AtomicBool,
    fail_writes: Option<io::ErrorKind>,
}

/// Test-side handle driving a [`MockSession`].
pub struct MockFeed {
    chunks: std_mpsc::Sender<Chunk>,
    resize_tx: Option<mpsc::Sender<WindowSize>>,
}

impl MockSession {
    /// A session that reports no PTY.
    pub fn new() -> (Self, MockFeed) {
        let (tx, rx) = std_mpsc::channel();
        let session = Self {
            chunks: parking_lot::Mutex::new(rx),
            pty: parking_lot::Mutex::new(None),
            written: parking_lot::Mutex::new(Vec::new()),
            reads_started: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            fail_writes: None,
        };
        (session, MockFeed { chunks: tx, resize_tx: None })
    }

    /// A session with a PTY of the given size and terminal type.
    pub fn interactive(term: &str, width: u16, height: u16) -> (Self, MockFeed) {
        let (mut session, mut feed) = Self::new();
        let (resize_tx, resize_rx) = mpsc::channel(16);
        session.pty = parking_lot::Mutex::new(Some(Pty {
            term: term.to_owned(),
            window: WindowSize::new(width, height),
            resize_rx,
        }));
        feed.resize_tx = Some(resize_tx);
        (session, feed)
    }

    pub fn fail_writes(mut self, kind: io::ErrorKind) -> Self {
        self.fail_writes = Some(kind);
        self
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Session for MockSession {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let chunk = self.chunks.lock().recv();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match chunk {
            Ok(Chunk::Byte(b)) => {
                buf[0] = b;
                Ok(1)
            }
            Ok(Chunk::Fail(kind)) => Err(io::Error::new(kind, "mock read failure")),
            Ok(Chunk::Eof) | Err(_) => Ok(0),
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.fail_writes {
            return Err(io::Error::new(kind, "mock write failure"));
        }
        self.written.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pty(&self) -> Option<Pty> {
        self.pty.lock().take()
    }
}

impl MockFeed {
    pub fn byte(&self, b: u8) {
        let _ = self.chunks.send(Chunk::Byte(b));
    }

    pub fn bytes(&self, data: &[u8]) {
        for &b in data {
            self.byte(b);
        }
    }

    pub fn fail(&self, kind: io::ErrorKind) {
        let _ = self.chunks.send(Chunk::Fail(kind));
    }

    pub fn eof(&self) {
        let _ = self.chunks.send(Chunk::Eof);
    }

    /// Deliver a window-change event. Fails when the session has no PTY or
    /// the resize receiver is gone.
    pub async fn resize(&self, width: u16, height: u16) -> anyhow::Result<()> {
        let tx = self
            .resize_tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("session has no pty"))?;
        tx.send(WindowSize::new(width, height))
            .await
            .map_err(|_| anyhow::anyhow!("resize listener gone"))
    }

    /// Close the resize channel while keeping the byte stream open.
    pub fn close_resize(&mut self) {
        self.resize_tx = None;
    }
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() > deadline {
            anyhow::bail!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}

/// Assert that an expression is `Err` and its message contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

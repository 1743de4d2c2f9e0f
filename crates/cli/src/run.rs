// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Echo loop over a [`TtyAdapter`], shared by `main` and integration tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::TtyError;
use crate::local::{LocalSession, RawModeGuard};
use crate::session::Session;
use crate::tty::TtyAdapter;
use crate::window::WindowSize;

/// Why the echo loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The quit byte was read.
    Quit,
    /// Someone else drained the adapter.
    Drained,
    /// The session's byte stream ended.
    EndOfStream,
}

/// Result of a completed echo session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub reason: EndReason,
    /// Bytes echoed, not counting the quit byte.
    pub echoed: usize,
    pub resizes: usize,
    pub window: WindowSize,
}

/// Initialize tracing on stderr, so logs never mix with the echoed stream.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(io::stderr).try_init(),
    };
    drop(result);
}

/// Echo the controlling terminal until the quit byte, a signal, or end of
/// input.
pub async fn run(config: Config) -> anyhow::Result<Summary> {
    let _raw = if config.no_raw || !LocalSession::is_terminal() {
        None
    } else {
        Some(RawModeGuard::enter().context("entering raw mode")?)
    };

    let adapter = Arc::new(TtyAdapter::new(LocalSession::new()));
    spawn_signal_drain(Arc::clone(&adapter));

    echo(&adapter, &config).await
}

/// Drain the adapter on SIGTERM or SIGINT.
fn spawn_signal_drain<S: Session>(adapter: Arc<TtyAdapter<S>>) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGTERM"),
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGINT"),
        }
        if let Err(e) = adapter.drain() {
            debug!("drain on signal: {e}");
        }
    });
}

/// Start `adapter` and write every byte it reads back to the session.
///
/// Ends on the configured quit byte (which drains and stops the adapter),
/// when the adapter is drained elsewhere, or at end of stream. The greeting,
/// if any, is fed through the injection path so it races real input the way
/// any synthetic byte would.
pub async fn echo<S: Session>(adapter: &TtyAdapter<S>, config: &Config) -> anyhow::Result<Summary> {
    let quit = config.quit()?;
    adapter.start().context("starting tty")?;

    let resizes = Arc::new(AtomicUsize::new(0));
    {
        let resizes = Arc::clone(&resizes);
        adapter.notify_resize(move |size| {
            resizes.fetch_add(1, Ordering::Relaxed);
            info!(%size, "terminal resized");
        });
    }

    if let Some(greeting) = config.greeting.as_ref() {
        let injector = adapter.injector();
        let bytes = greeting.clone().into_bytes();
        tokio::spawn(async move {
            if let Err(e) = injector.interleave_all(&bytes).await {
                debug!("greeting cut short: {e}");
            }
        });
    }

    let mut buf = [0u8; 1];
    let mut echoed = 0;
    let reason = loop {
        match adapter.read(&mut buf).await {
            Ok(0) => break EndReason::Drained,
            Ok(_) if buf[0] == quit => {
                ensure_drained(adapter)?;
                break EndReason::Quit;
            }
            Ok(_) => {
                adapter.write(&render(buf[0], config.hex)).context("writing to session")?;
                echoed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break EndReason::EndOfStream,
            Err(e) => return Err(e).context("reading from session"),
        }
    };

    if !adapter.is_stopped() {
        adapter.stop()?;
    }
    adapter.clear_resize();
    adapter.close()?;

    let summary = Summary {
        reason,
        echoed,
        resizes: resizes.load(Ordering::Relaxed),
        window: adapter.window_size()?,
    };
    info!(reason = ?summary.reason, echoed, "echo finished");
    Ok(summary)
}

/// Drain `adapter`, accepting a drain that already happened (e.g. from the
/// signal task).
fn ensure_drained<S: Session>(adapter: &TtyAdapter<S>) -> Result<(), TtyError> {
    match adapter.drain() {
        Ok(()) | Err(TtyError::AlreadyDrained) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Bytes written back for one byte read. Raw mode leaves carriage returns
/// alone, so they get a line feed.
fn render(byte: u8, hex: bool) -> Vec<u8> {
    if hex {
        format!("{byte:02x} ").into_bytes()
    } else if byte == b'\r' {
        b"\r\n".to_vec()
    } else {
        vec![byte]
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

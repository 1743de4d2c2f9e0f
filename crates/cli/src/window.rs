// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Terminal window dimensions in character cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u16,
    pub height: u16,
}

impl WindowSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Callback invoked after each processed resize event.
pub type ResizeCallback = Arc<dyn Fn(WindowSize) + Send + Sync>;

#[derive(Default)]
struct Inner {
    size: WindowSize,
    callback: Option<ResizeCallback>,
}

/// Last known window size plus the single registered resize callback.
///
/// Both live behind one lock. The lock is only held for field access; the
/// callback is cloned out and invoked after the guard is released, so a
/// callback may freely call back into [`WindowState::size`].
#[derive(Default)]
pub struct WindowState {
    inner: Mutex<Inner>,
}

impl WindowState {
    pub fn new(size: WindowSize) -> Self {
        Self { inner: Mutex::new(Inner { size, callback: None }) }
    }

    pub fn size(&self) -> WindowSize {
        self.inner.lock().size
    }

    /// Overwrite the size without notifying the callback.
    pub fn reset(&self, size: WindowSize) {
        self.inner.lock().size = size;
    }

    /// Replace the registered callback. Returns whether one was replaced.
    pub fn set_callback(&self, callback: Option<ResizeCallback>) -> bool {
        let mut inner = self.inner.lock();
        let replaced = inner.callback.is_some();
        inner.callback = callback;
        replaced
    }

    /// Record a new size and hand back the callback to run once unlocked.
    fn apply(&self, size: WindowSize) -> Option<ResizeCallback> {
        let mut inner = self.inner.lock();
        inner.size = size;
        inner.callback.clone()
    }

    /// Record a new size, then invoke the current callback (if any) outside
    /// the lock.
    pub fn resize(&self, size: WindowSize) {
        if let Some(callback) = self.apply(size) {
            callback(size);
        }
    }
}

impl fmt::Debug for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WindowState")
            .field("size", &inner.size)
            .field("callback", &inner.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;

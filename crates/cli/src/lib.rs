// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod error;
pub mod interleave;
pub mod local;
pub mod run;
pub mod session;
pub mod test_support;
pub mod tty;
pub mod window;

pub use error::TtyError;
pub use interleave::{Injector, InterleavedReader, Outcome};
pub use session::{Pty, Session};
pub use tty::TtyAdapter;
pub use window::WindowSize;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

fn counter() -> (Arc<AtomicUsize>, ResizeCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    (count, Arc::new(move |_: WindowSize| {
        c.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn new_reports_initial_size() {
    let state = WindowState::new(WindowSize::new(80, 24));
    assert_eq!(state.size(), WindowSize::new(80, 24));
}

#[test]
fn resize_without_callback_updates_size() {
    let state = WindowState::new(WindowSize::new(80, 24));
    state.resize(WindowSize::new(100, 40));
    assert_eq!(state.size(), WindowSize::new(100, 40));
}

#[test]
fn resize_fires_callback_once_per_event() {
    let state = WindowState::new(WindowSize::new(80, 24));
    let (count, cb) = counter();
    state.set_callback(Some(cb));

    state.resize(WindowSize::new(100, 40));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    state.resize(WindowSize::new(120, 50));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn replaced_callback_never_fires_again() {
    let state = WindowState::new(WindowSize::new(80, 24));
    let (old_count, old_cb) = counter();
    let (new_count, new_cb) = counter();

    assert!(!state.set_callback(Some(old_cb)));
    state.resize(WindowSize::new(90, 30));
    assert!(state.set_callback(Some(new_cb)));
    state.resize(WindowSize::new(100, 40));
    state.resize(WindowSize::new(110, 45));

    assert_eq!(old_count.load(Ordering::SeqCst), 1);
    assert_eq!(new_count.load(Ordering::SeqCst), 2);
}

#[test]
fn callback_runs_outside_lock() {
    let state = Arc::new(WindowState::new(WindowSize::new(80, 24)));
    let seen = Arc::new(parking_lot::Mutex::new(None));

    let s = Arc::clone(&state);
    let sn = Arc::clone(&seen);
    // Re-entering the state from the callback would deadlock if the lock
    // were still held.
    state.set_callback(Some(Arc::new(move |size: WindowSize| {
        *sn.lock() = Some((size, s.size()));
    })));
    state.resize(WindowSize::new(132, 43));

    assert_eq!(*seen.lock(), Some((WindowSize::new(132, 43), WindowSize::new(132, 43))));
}

#[test]
fn reset_does_not_notify() {
    let state = WindowState::new(WindowSize::new(80, 24));
    let (count, cb) = counter();
    state.set_callback(Some(cb));
    state.reset(WindowSize::new(1, 1));
    assert_eq!(state.size(), WindowSize::new(1, 1));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn clearing_callback_silences_events() {
    let state = WindowState::new(WindowSize::new(80, 24));
    let (count, cb) = counter();
    state.set_callback(Some(cb));
    assert!(state.set_callback(None));
    state.resize(WindowSize::new(100, 40));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[yare::parameterized(
    standard = { 80, 24, "80x24" },
    wide = { 200, 50, "200x50" },
    empty = { 0, 0, "0x0" },
)]
fn display(width: u16, height: u16, expected: &str) {
    assert_eq!(WindowSize::new(width, height).to_string(), expected);
}

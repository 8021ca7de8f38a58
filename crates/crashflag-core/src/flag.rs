//! Process-wide fatal signal flag
//!
//! The flag is written from signal context and read from ordinary threads.
//! Everything here is a single atomic operation so it stays safe to touch
//! from inside a signal handler.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Value held by the flag while no fatal signal has been observed
pub const NO_SIGNAL: i32 = 0;

/// The one flag shared by the installed handler and every reader
pub static CRASH_FLAG: CrashFlag = CrashFlag::new();

/// Lifecycle of the crash flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// No handler installed and nothing recorded
    Unarmed,
    /// Handler installed, no fatal signal yet
    Armed,
    /// A fatal signal has been recorded
    Tripped(i32),
}

/// Last fatal signal observed by the process
#[derive(Debug)]
pub struct CrashFlag {
    last_signal: AtomicI32,
    armed: AtomicBool,
}

impl CrashFlag {
    pub const fn new() -> Self {
        Self {
            last_signal: AtomicI32::new(NO_SIGNAL),
            armed: AtomicBool::new(false),
        }
    }

    /// Store a signal number. Async-signal-safe.
    #[inline]
    pub fn record(&self, signal: i32) {
        self.last_signal.store(signal, Ordering::SeqCst);
    }

    /// Current value: `0` when nothing has fired, otherwise the signal number
    #[inline]
    pub fn status(&self) -> i32 {
        self.last_signal.load(Ordering::SeqCst)
    }

    pub fn is_tripped(&self) -> bool {
        self.status() != NO_SIGNAL
    }

    pub(crate) fn mark_armed(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> HandlerState {
        match self.status() {
            NO_SIGNAL if self.armed.load(Ordering::SeqCst) => HandlerState::Armed,
            NO_SIGNAL => HandlerState::Unarmed,
            sig => HandlerState::Tripped(sig),
        }
    }
}

impl Default for CrashFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the process-wide flag
///
/// Safe to call at any time, including before a handler has been installed.
pub fn signal_status() -> i32 {
    CRASH_FLAG.status()
}

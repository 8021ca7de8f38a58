//! crashflag-core: Native crash detection for managed applications
//!
//! This crate provides the pieces needed to notice a native fault from code
//! that cannot catch one itself:
//! - A process-wide flag recording the last fatal signal
//! - Installation of a minimal, async-signal-safe handler
//! - Crash markers that survive a process restart
//! - A polling monitor and a restarting watchdog that act on the flag

pub mod config;
pub mod flag;
pub mod handler;
pub mod monitor;
pub mod signal;

#[cfg(unix)]
pub mod marker;
#[cfg(unix)]
pub mod watchdog;

#[cfg(all(unix, feature = "fault-injection"))]
pub mod fault;

pub use config::{load_config, load_config_from, save_config_to, ConfigError, CrashConfig};
pub use flag::{signal_status, CrashFlag, HandlerState, CRASH_FLAG};
pub use handler::{handler_state, install, install_for, is_armed, HandlerError};
pub use monitor::FlagMonitor;
pub use signal::{describe_signal, FatalSignal};

#[cfg(unix)]
pub use marker::{
    clear_crash_marker, crash_marker_path, read_crash_marker, take_crash_marker,
    write_crash_marker, CrashMarker,
};
#[cfg(unix)]
pub use watchdog::{run_watchdog, WatchdogError};

#[cfg(all(unix, feature = "fault-injection"))]
pub use fault::{inject_fault, Fault};

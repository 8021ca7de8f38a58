//! Watchdog process for crash supervision
//!
//! The watchdog is a lightweight parent process that:
//! 1. Spawns the supervised process
//! 2. Waits for it to exit
//! 3. On death by a fatal signal, writes a crash marker and relaunches it
//!
//! The relaunched process can then pick the signal up with
//! [`take_crash_marker`](crate::marker::take_crash_marker), which is how a
//! fatal signal that killed the process before anyone polled the flag still
//! gets reported.

use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Duration;

use crate::config::WatchdogConfig;
use crate::marker::{write_crash_marker, CrashMarker};
use crate::signal::{describe_signal, FatalSignal};

/// Set to `1` in the environment of a supervised process
pub const ENV_SUPERVISED: &str = "CRASHFLAG_SUPERVISED";
/// Number of restarts so far, in the environment of a supervised process
pub const ENV_RESTART_COUNT: &str = "CRASHFLAG_RESTART_COUNT";

/// Errors from the watchdog
#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to spawn child: {0}")]
    Spawn(String),
}

/// How a supervised run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildExit {
    Code(i32),
    Signal(i32),
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ChildExit::Code(code),
            (None, Some(sig)) => ChildExit::Signal(sig),
            // Neither code nor signal: treat as abnormal
            (None, None) => ChildExit::Code(1),
        }
    }
}

/// Run the watchdog
///
/// Only deaths by a [`FatalSignal`] count as crashes. Returns the child's exit
/// code once it exits normally, `128 + signal` when another signal stops it,
/// or `1` when it keeps crashing beyond `config.max_restarts`.
pub fn run_watchdog<S: AsRef<std::ffi::OsStr>>(
    program: &Path,
    args: &[S],
    config: &WatchdogConfig,
    marker_path: &Path,
) -> Result<i32, WatchdogError> {
    let args: Vec<OsString> = args.iter().map(|a| a.as_ref().to_os_string()).collect();
    let mut restart_count: u32 = 0;

    loop {
        let mut child = Command::new(program)
            .args(&args)
            .env(ENV_SUPERVISED, "1")
            .env(ENV_RESTART_COUNT, restart_count.to_string())
            .spawn()
            .map_err(|e| WatchdogError::Spawn(format!("{}: {}", program.display(), e)))?;

        let pid = child.id();
        log::info!(
            "Watchdog: spawned child PID {} (restart count: {})",
            pid,
            restart_count
        );

        let exit = ChildExit::from(child.wait()?);

        let signal = match exit {
            ChildExit::Code(code) => {
                log::info!("Watchdog: child exited with code {}", code);
                return Ok(code);
            }
            ChildExit::Signal(sig) if FatalSignal::from_raw(sig).is_none() => {
                // Deliberate stop (SIGTERM, SIGKILL, ...): not a crash
                log::info!("Watchdog: child stopped by signal {}", sig);
                return Ok(128 + sig);
            }
            ChildExit::Signal(sig) => sig,
        };

        restart_count += 1;
        log::warn!(
            "Watchdog: child PID {} died with {}, restart {}/{}",
            pid,
            describe_signal(signal),
            restart_count,
            config.max_restarts
        );

        // Write crash marker for the next process
        if let Err(e) = write_crash_marker(marker_path, &CrashMarker::new(signal, pid)) {
            log::error!("Watchdog: failed to write crash marker: {}", e);
        }

        if restart_count > config.max_restarts {
            log::error!("Watchdog: max restarts exceeded, giving up");
            return Ok(1);
        }

        std::thread::sleep(Duration::from_millis(config.restart_delay_ms));
    }
}

//! Fatal signal handler installation
//!
//! The handler only stores the signal number into [`CRASH_FLAG`]. It is
//! registered with `SA_RESETHAND`, so after it records a genuine fault and
//! returns, the faulting instruction runs again under the default disposition
//! and the process terminates as it would have without us.

use std::io;

use thiserror::Error;

use crate::flag::{HandlerState, CRASH_FLAG};
use crate::signal::FatalSignal;

/// Errors from handler installation
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Failed to install handler for {signal}: {source}")]
    Install {
        signal: FatalSignal,
        #[source]
        source: io::Error,
    },
}

#[cfg(unix)]
extern "C" fn on_fatal_signal(signal: libc::c_int) {
    // Async-signal context: one atomic store and nothing else.
    CRASH_FLAG.record(signal);
}

/// Arm the handler for SIGSEGV
///
/// Calling this again simply re-registers the same handler.
pub fn install() -> Result<(), HandlerError> {
    install_for(&[FatalSignal::Segv])
}

/// Arm the handler for each of `signals`, replacing any previous handler
#[cfg(unix)]
pub fn install_for(signals: &[FatalSignal]) -> Result<(), HandlerError> {
    for &signal in signals {
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_fatal_signal as libc::sighandler_t;
            action.sa_flags = libc::SA_RESETHAND;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal.as_raw(), &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(HandlerError::Install {
                signal,
                source: io::Error::last_os_error(),
            });
        }
        log::debug!("Installed crash handler for {}", signal);
    }

    CRASH_FLAG.mark_armed();
    Ok(())
}

#[cfg(not(unix))]
pub fn install_for(signals: &[FatalSignal]) -> Result<(), HandlerError> {
    log::warn!(
        "Fatal signal handlers are not supported on this platform ({} requested)",
        signals.len()
    );
    Ok(())
}

/// Whether a handler has been installed in this process
pub fn is_armed() -> bool {
    !matches!(CRASH_FLAG.state(), HandlerState::Unarmed)
}

pub fn handler_state() -> HandlerState {
    CRASH_FLAG.state()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_repeatable() {
        install().unwrap();
        install().unwrap();
        assert!(is_armed());
    }

    #[test]
    fn test_install_replaces_previous_disposition() {
        install_for(&[FatalSignal::Bus]).unwrap();

        let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::sigaction(libc::SIGBUS, std::ptr::null(), &mut current) };
        assert_eq!(rc, 0);
        assert_eq!(current.sa_sigaction, on_fatal_signal as libc::sighandler_t);
    }

    #[test]
    fn test_error_names_signal() {
        let err = HandlerError::Install {
            signal: FatalSignal::Segv,
            source: io::Error::from_raw_os_error(libc::EINVAL),
        };
        assert!(err.to_string().starts_with("Failed to install handler for SIGSEGV"));
    }
}

//! Flag behavior in a process that never receives a fatal signal

use std::thread;

use crashflag_core::{handler_state, install, install_for, is_armed, signal_status};
use crashflag_core::{FatalSignal, HandlerState};

#[test]
fn status_stays_clear_through_repeated_install() {
    assert_eq!(signal_status(), 0);

    install().unwrap();
    install().unwrap();
    install_for(&[FatalSignal::Segv, FatalSignal::Bus]).unwrap();

    assert!(is_armed());
    assert_eq!(handler_state(), HandlerState::Armed);
    assert_eq!(signal_status(), 0);
}

#[test]
fn concurrent_reads_see_no_signal() {
    let handles: Vec<_> = (0..16)
        .map(|_| thread::spawn(|| (0..50_000).all(|_| signal_status() == 0)))
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

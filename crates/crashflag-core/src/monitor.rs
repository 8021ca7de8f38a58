//! Flag monitor
//!
//! Polls a [`CrashFlag`] from an ordinary thread so that logging, marker
//! writing and any other reporting happen outside signal context.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::flag::{CrashFlag, CRASH_FLAG};
use crate::signal::describe_signal;

/// Background poller that reports the first fatal signal it sees
pub struct FlagMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FlagMonitor {
    /// Watch the process-wide flag
    pub fn watch_process<F>(interval: Duration, on_trip: F) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        Self::spawn(&CRASH_FLAG, interval, on_trip)
    }

    /// Watch `flag`, calling `on_trip` once with the signal number
    pub fn spawn<F>(flag: &'static CrashFlag, interval: Duration, on_trip: F) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("crashflag-monitor".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::SeqCst) {
                    let signal = flag.status();
                    if signal != 0 {
                        log::warn!("Native crash detected: {}", describe_signal(signal));
                        on_trip(signal);
                        return;
                    }
                    thread::park_timeout(interval);
                }
                log::trace!("Flag monitor stopped");
            })?;

        log::debug!("Started flag monitor (interval: {:?})", interval);

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the monitor thread has exited (tripped or stopped)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop polling and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Flag monitor callback panicked");
            }
        }
    }
}

impl Drop for FlagMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    fn leaked_flag() -> &'static CrashFlag {
        Box::leak(Box::new(CrashFlag::new()))
    }

    #[test]
    fn test_reports_tripped_flag() {
        let flag = leaked_flag();
        let (tx, rx) = mpsc::channel();
        let monitor = FlagMonitor::spawn(flag, Duration::from_millis(5), move |sig| {
            tx.send(sig).unwrap();
        })
        .unwrap();

        flag.record(11);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 11);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !monitor.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(monitor.is_finished());
    }

    #[test]
    fn test_stop_without_trip() {
        let flag = leaked_flag();
        let (tx, rx) = mpsc::channel::<i32>();
        let monitor = FlagMonitor::spawn(flag, Duration::from_millis(5), move |sig| {
            tx.send(sig).unwrap();
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(!monitor.is_finished());
        monitor.stop();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let flag = leaked_flag();
        let monitor = FlagMonitor::spawn(flag, Duration::from_secs(3), |_| {}).unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        monitor.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_drop_interrupts_long_interval() {
        let flag = leaked_flag();
        let monitor = FlagMonitor::spawn(flag, Duration::from_secs(3), |_| {}).unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        drop(monitor);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_already_tripped_reported_immediately() {
        let flag = leaked_flag();
        flag.record(7);

        let (tx, rx) = mpsc::channel();
        let _monitor = FlagMonitor::spawn(flag, Duration::from_secs(60), move |sig| {
            tx.send(sig).unwrap();
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }
}

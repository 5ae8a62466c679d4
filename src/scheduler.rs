//! Interval scheduling of synchronization passes.
//!
//! The next pass is scheduled only after the current one returns, so passes
//! never overlap inside a process. The interval is the idle gap between passes,
//! not a fixed rate.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Granularity at which a sleeping scheduler notices a shutdown request.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Cloneable flag used to ask a running scheduler to stop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the scheduler to stop before its next pass.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a pass function repeatedly with a fixed idle gap between runs.
#[derive(Debug)]
pub struct Scheduler {
    /// Idle time between the end of one pass and the start of the next
    interval: Duration,
    /// Stop flag shared with signal handlers and tests
    shutdown: ShutdownHandle,
}

impl Scheduler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Returns a handle that stops this scheduler when requested.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Calls `pass` until shutdown is requested, sleeping `interval` after each call.
    ///
    /// `pass` receives the 1-based pass number. Returns how many passes ran.
    pub fn run<F>(&self, mut pass: F) -> u64
    where
        F: FnMut(u64),
    {
        let mut completed = 0;

        while !self.shutdown.is_requested() {
            completed += 1;
            debug!(pass = completed, "Starting pass");
            pass(completed);

            if !self.sleep_interval() {
                break;
            }
        }

        info!(passes = completed, "Scheduler stopped");
        completed
    }

    /// Sleeps for the interval. Returns `false` if shutdown was requested meanwhile.
    fn sleep_interval(&self) -> bool {
        let deadline = Instant::now() + self.interval;

        loop {
            if self.shutdown.is_requested() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(SHUTDOWN_POLL));
        }
    }
}

/// Routes Ctrl-C (SIGINT) and SIGTERM to `handle`.
///
/// The first signal lets the current pass finish and stops the scheduler. A
/// second signal exits immediately; the next run converges regardless of
/// where the interrupted pass stopped.
///
/// # Errors
///
/// Returns an error if a handler is already installed for this process.
pub fn install_signal_handlers(handle: &ShutdownHandle) -> Result<()> {
    let handle = handle.clone();
    ctrlc::set_handler(move || {
        if handle.is_requested() {
            // Second signal: stop waiting for the in-flight pass
            std::process::exit(130);
        }
        info!("Shutdown requested, finishing current pass");
        handle.request();
    })
    .context("Failed to install signal handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_runs_until_shutdown() {
        let scheduler = Scheduler::new(Duration::from_millis(1));
        let handle = scheduler.shutdown_handle();

        let passes = scheduler.run(|n| {
            if n == 3 {
                handle.request();
            }
        });

        assert_eq!(passes, 3);
    }

    #[test]
    fn test_no_pass_after_early_shutdown() {
        let scheduler = Scheduler::new(Duration::from_millis(1));
        scheduler.shutdown_handle().request();

        let mut called = false;
        assert_eq!(scheduler.run(|_| called = true), 0);
        assert!(!called);
    }

    #[test]
    fn test_passes_never_overlap() {
        let scheduler = Scheduler::new(Duration::ZERO);
        let handle = scheduler.shutdown_handle();
        let running = AtomicUsize::new(0);

        scheduler.run(|n| {
            assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0);
            std::thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
            if n == 5 {
                handle.request();
            }
        });
    }

    #[test]
    fn test_interval_is_gap_after_pass() {
        let interval = Duration::from_millis(30);
        let scheduler = Scheduler::new(interval);
        let handle = scheduler.shutdown_handle();
        let mut finished_at: Option<Instant> = None;
        let mut gaps = Vec::new();

        scheduler.run(|n| {
            if let Some(prev) = finished_at {
                gaps.push(prev.elapsed());
            }
            // A slow pass must not shorten the following gap
            std::thread::sleep(Duration::from_millis(40));
            finished_at = Some(Instant::now());
            if n == 3 {
                handle.request();
            }
        });

        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().all(|gap| *gap >= interval));
    }

    #[test]
    fn test_shutdown_interrupts_sleep() {
        let scheduler = Scheduler::new(Duration::from_secs(60));
        let handle = scheduler.shutdown_handle();

        let start = Instant::now();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.request();
        });
        let passes = scheduler.run(|_| {});
        stopper.join().unwrap();

        assert_eq!(passes, 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_signal_handler_installs_once() {
        let scheduler = Scheduler::new(Duration::from_millis(1));
        let handle = scheduler.shutdown_handle();

        assert!(install_signal_handlers(&handle).is_ok());
        assert!(install_signal_handlers(&handle).is_err());
        assert!(!handle.is_requested());
    }
}

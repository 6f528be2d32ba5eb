//! One-shot wall clock deadline
//!
//! The deadline runs on its own thread so it keeps time while the polling
//! loop is blocked in a status change wait. The loop only ever reads the
//! flag; the timer thread only ever sets it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::trace;

use crate::config::Timeout;

/// Cancellable one-shot deadline
///
/// Dropping the timer cancels it, so no signal outlives the call that
/// started it.
#[derive(Debug)]
pub struct DeadlineTimer {
    timeout: Timeout,
    fired: Arc<AtomicBool>,
    worker: Option<Worker>,
    started: bool,
}

#[derive(Debug)]
struct Worker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl DeadlineTimer {
    /// Create an idle timer for `timeout`
    pub fn new(timeout: Timeout) -> Self {
        Self {
            timeout,
            fired: Arc::new(AtomicBool::new(false)),
            worker: None,
            started: false,
        }
    }

    /// Create a timer and start it right away
    pub fn started(timeout: Timeout) -> Self {
        let mut timer = Self::new(timeout);
        timer.start();
        timer
    }

    /// Start counting down
    ///
    /// Starting twice has no effect. An infinite timeout never fires and
    /// spawns nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let Some(duration) = self.timeout.duration() else {
            return;
        };

        let (cancel, cancelled) = bounded::<()>(1);
        let fired = Arc::clone(&self.fired);
        let handle = thread::spawn(move || {
            // A cancel message or a dropped sender both end the wait early.
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(duration) {
                trace!(?duration, "Deadline fired");
                fired.store(true, Ordering::Release);
            }
        });

        self.worker = Some(Worker { cancel, handle });
    }

    /// Whether the timer has been started
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the deadline has passed, without blocking
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Stop the timer and wait for its thread to finish
    ///
    /// Cancelling an idle, fired or already cancelled timer is a no-op.
    pub fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.cancel.try_send(());
            let _ = worker.handle.join();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_fires_after_timeout() {
        let timer = DeadlineTimer::started(Timeout::from_millis(50));
        assert!(!timer.has_fired());

        thread::sleep(Duration::from_millis(150));
        assert!(timer.has_fired());
    }

    #[test]
    fn test_idle_timer_never_fires() {
        let timer = DeadlineTimer::new(Timeout::from_millis(10));
        thread::sleep(Duration::from_millis(50));
        assert!(!timer.is_started());
        assert!(!timer.has_fired());
    }

    #[test]
    fn test_infinite_timer_never_fires() {
        let mut timer = DeadlineTimer::started(Timeout::Infinite);
        assert!(timer.is_started());
        assert!(timer.worker.is_none());
        thread::sleep(Duration::from_millis(20));
        assert!(!timer.has_fired());
        timer.cancel();
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timer = DeadlineTimer::started(Timeout::from_millis(100));

        let start = Instant::now();
        timer.cancel();
        assert!(start.elapsed() < Duration::from_millis(100));

        thread::sleep(Duration::from_millis(150));
        assert!(!timer.has_fired());

        // Second cancel is a no-op
        timer.cancel();
    }

    #[test]
    fn test_drop_cancels() {
        let timer = DeadlineTimer::started(Timeout::from_millis(50));
        let fired = Arc::clone(&timer.fired);

        let start = Instant::now();
        drop(timer);
        assert!(start.elapsed() < Duration::from_millis(50));

        thread::sleep(Duration::from_millis(150));
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut timer = DeadlineTimer::new(Timeout::from_millis(30));
        timer.start();
        timer.start();
        thread::sleep(Duration::from_millis(100));
        assert!(timer.has_fired());
    }
}

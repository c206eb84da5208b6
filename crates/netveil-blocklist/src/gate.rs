//! Single-fire readiness latch.
//!
//! Counts down from a fixed number of completions. Once the count reaches
//! zero the gate stays open for the rest of the process and `wait()`
//! returns after a single atomic load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use tracing::debug;

/// Countdown latch released by the block-list load pipelines.
#[derive(Debug)]
pub struct ReadinessGate {
    /// Completions still outstanding
    remaining: Mutex<usize>,
    /// Woken once, when `remaining` hits zero
    released: Condvar,
    /// Fast path for callers arriving after release
    ready: AtomicBool,
}

impl ReadinessGate {
    /// Create a gate that opens after `count` calls to [`count_down`](Self::count_down).
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
            ready: AtomicBool::new(count == 0),
        }
    }

    /// Whether every expected completion has been signalled.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Block the calling thread until the gate opens.
    ///
    /// No timeout: a caller that arrives before loading finishes waits for
    /// the pipelines, never for a clock.
    pub fn wait(&self) {
        if self.is_ready() {
            return;
        }

        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *remaining > 0 {
            remaining = self
                .released
                .wait(remaining)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Record one completion. Extra calls after the gate opened are ignored.
    pub fn count_down(&self) {
        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *remaining == 0 {
            return;
        }

        *remaining -= 1;
        if *remaining == 0 {
            self.ready.store(true, Ordering::Release);
            self.released.notify_all();
            debug!("Readiness gate released");
        }
    }

    /// Completions still outstanding.
    pub fn remaining(&self) -> usize {
        *self
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_count_is_open() {
        let gate = ReadinessGate::new(0);
        assert!(gate.is_ready());
        gate.wait();
    }

    #[test]
    fn test_opens_after_exact_count() {
        let gate = ReadinessGate::new(2);
        assert!(!gate.is_ready());

        gate.count_down();
        assert!(!gate.is_ready());
        assert_eq!(gate.remaining(), 1);

        gate.count_down();
        assert!(gate.is_ready());
        assert_eq!(gate.remaining(), 0);

        // Extra signals do not underflow
        gate.count_down();
        assert_eq!(gate.remaining(), 0);
        assert!(gate.is_ready());
    }

    #[test]
    fn test_many_waiters_release_together() {
        const WAITERS: usize = 32;

        let gate = Arc::new(ReadinessGate::new(2));
        let (done_tx, done_rx) = unbounded();

        let handles: Vec<_> = (0..WAITERS)
            .map(|i| {
                let gate = gate.clone();
                let done_tx = done_tx.clone();
                thread::spawn(move || {
                    gate.wait();
                    done_tx.send(i).unwrap();
                })
            })
            .collect();

        // Nobody gets through while a pipeline is outstanding
        gate.count_down();
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        gate.count_down();
        for _ in 0..WAITERS {
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Late callers pass straight through
        gate.wait();
    }
}

//! One-shot binary signal
//!
//! A single-producer, single-consumer handoff: `raise` latches the signal,
//! `wait` blocks until it is latched and consumes it. Raising before the
//! waiter arrives is not lost.
//!
//! `wait` busy-spins and holds its CPU for as long as the wait lasts, which
//! for `wait(pid)` is unbounded. A kernel with a scheduler is expected to
//! replace the spin with a blocking primitive (a semaphore that parks the
//! thread); `raise`/`wait` are the only points that would change.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Signal {
    raised: AtomicBool,
}

impl Signal {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Latch the signal, releasing at most one waiter.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consume the signal if it is latched.
    pub fn try_consume(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Block until the signal is latched, then consume it.
    pub fn wait(&self) {
        while !self.try_consume() {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_raise_before_wait_is_latched() {
        let s = Signal::new();
        s.raise();
        s.wait();
        assert!(!s.try_consume());
    }

    #[test]
    fn test_wait_released_by_other_thread() {
        let s = Arc::new(Signal::new());
        let raiser = {
            let s = s.clone();
            thread::spawn(move || s.raise())
        };
        s.wait();
        raiser.join().unwrap();
        assert!(!s.try_consume());
    }
}

//! Interruptible waits.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use Error;

struct State {
    /// Is an interrupt pending?
    pending: Mutex<bool>,
    /// Signaled whenever an interrupt is raised.
    raised: Condvar,
}

/// An interrupt handle.
///
/// Clones share the same flag, so one clone can be handed to the thread doing an interruptible
/// wait and another kept for interrupting it. An interrupt is consumed by the wait that observes
/// it: the flag is cleared as the wait returns `Error::Interrupted`.
#[derive(Clone)]
pub struct Interrupt {
    state: Arc<State>,
}

impl Interrupt {
    /// Create a handle with no pending interrupt.
    pub fn new() -> Interrupt {
        Interrupt {
            state: Arc::new(State {
                pending: Mutex::new(false),
                raised: Condvar::new(),
            }),
        }
    }

    /// Raise an interrupt, waking any interruptible wait on this handle.
    ///
    /// If no wait is in progress, the next one fails immediately.
    pub fn interrupt(&self) {
        *self.state.pending.lock() = true;
        self.state.raised.notify_all();
    }

    /// Is an interrupt pending?
    pub fn is_interrupted(&self) -> bool {
        *self.state.pending.lock()
    }

    /// Discard a pending interrupt.
    pub fn clear(&self) {
        *self.state.pending.lock() = false;
    }

    /// Sleep for `duration`, unless interrupted.
    ///
    /// A duration too long to be represented as a deadline sleeps until interrupted.
    pub fn sleep(&self, duration: Duration) -> Result<(), Error> {
        let deadline = Instant::now().checked_add(duration);
        let mut pending = self.state.pending.lock();

        loop {
            if *pending {
                *pending = false;
                return Err(Error::Interrupted);
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Ok(());
                    }

                    self.state.raised.wait_until(&mut pending, deadline);
                }
                None => self.state.raised.wait(&mut pending),
            }
        }
    }
}

impl Default for Interrupt {
    fn default() -> Interrupt {
        Interrupt::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn sleep_runs_out() {
        let i = Interrupt::new();
        let start = Instant::now();

        assert_eq!(i.sleep(Duration::from_millis(10)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn pending_interrupt_fails_fast() {
        let i = Interrupt::new();
        i.interrupt();
        assert!(i.is_interrupted());

        assert_eq!(i.sleep(Duration::from_secs(60)), Err(Error::Interrupted));
        // Consumed.
        assert!(!i.is_interrupted());
        assert_eq!(i.sleep(Duration::from_millis(1)), Ok(()));
    }

    #[test]
    fn unbounded_sleep() {
        let forever = Duration::from_secs(u64::max_value());

        let i = Interrupt::new();
        i.interrupt();
        assert_eq!(i.sleep(forever), Err(Error::Interrupted));

        let j = i.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            j.interrupt();
        });

        assert_eq!(i.sleep(forever), Err(Error::Interrupted));
        t.join().unwrap();
    }

    #[test]
    fn clear() {
        let i = Interrupt::new();
        i.interrupt();
        i.clear();

        assert_eq!(i.sleep(Duration::from_millis(1)), Ok(()));
    }

    #[test]
    fn interrupt_from_other_thread() {
        let i = Interrupt::new();
        let j = i.clone();
        let start = Instant::now();

        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            j.interrupt();
        });

        assert_eq!(i.sleep(Duration::from_secs(60)), Err(Error::Interrupted));
        assert!(start.elapsed() < Duration::from_secs(60));
        t.join().unwrap();
    }
}

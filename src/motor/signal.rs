//! Level-triggered cross-thread signal with an interruptible wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    raised: Mutex<bool>,
    condvar: Condvar,
}

/// A flag that can be raised from any thread and waited on with a timeout.
///
/// Clones share the same flag. Raising is idempotent and stays in effect until
/// [`reset`](Signal::reset) is called.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    inner: Arc<Inner>,
}

impl Signal {
    /// Create a signal in the lowered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter.
    pub fn raise(&self) {
        let mut raised = self.inner.raised.lock();
        *raised = true;
        self.inner.condvar.notify_all();
    }

    /// Lower the signal.
    pub fn reset(&self) {
        *self.inner.raised.lock() = false;
    }

    /// Check whether the signal is raised.
    pub fn is_raised(&self) -> bool {
        *self.inner.raised.lock()
    }

    /// Block for `timeout` or until the signal is raised, whichever is first.
    ///
    /// Returns `true` if the signal is raised when the wait ends.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut raised = self.inner.raised.lock();
        if timeout.is_zero() {
            return *raised;
        }

        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !*raised {
                    if self.inner.condvar.wait_until(&mut raised, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while !*raised {
                    self.inner.condvar.wait(&mut raised);
                }
            }
        }

        *raised
    }
}

/// Fence trait and the CPU-side event used to wait on it

use std::any::Any;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use crate::error::Result;
use crate::{engine_bail_warn, engine_err};

const SOURCE: &str = "galaxy3d::FenceEvent";

/// Monotonic counter signaled by the GPU as it completes submitted work
pub trait Fence: Send + Sync {
    /// Highest value the GPU has reached so far
    fn completed_value(&self) -> u64;

    /// Arrange for `event` to be set once the fence reaches `value`
    ///
    /// If the value is already reached, the event is set immediately.
    fn set_event_on_completion(&self, value: u64, event: &Arc<FenceEvent>) -> Result<()>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// Auto-reset event a thread can block on until a fence fires it
///
/// This is the core's only blocking primitive. `wait` consumes the signal,
/// so the same event can be re-armed for the next fence value.
#[derive(Debug, Default)]
pub struct FenceEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl FenceEvent {
    /// Create an unsignaled event
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the event, waking one waiter
    pub fn set(&self) {
        let mut signaled = match self.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *signaled = true;
        self.condvar.notify_one();
    }

    /// Whether the event is currently signaled
    pub fn is_set(&self) -> bool {
        self.signaled.lock().map(|s| *s).unwrap_or(false)
    }

    /// Block until the event is signaled, then reset it
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait (`None` waits forever)
    ///
    /// # Errors
    ///
    /// `Error::BackendError` if the timeout elapses or the event lock is poisoned.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut signaled = self.signaled.lock()
            .map_err(|_| engine_err!(SOURCE, "Fence event lock poisoned"))?;

        while !*signaled {
            match deadline {
                None => {
                    signaled = self.condvar.wait(signaled)
                        .map_err(|_| engine_err!(SOURCE, "Fence event lock poisoned"))?;
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        engine_bail_warn!(SOURCE, "Timed out after {:?} waiting for fence event",
                            timeout.unwrap_or_default());
                    }
                    let (guard, _) = self.condvar.wait_timeout(signaled, deadline - now)
                        .map_err(|_| engine_err!(SOURCE, "Fence event lock poisoned"))?;
                    signaled = guard;
                }
            }
        }

        *signaled = false;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "fence_tests.rs"]
mod tests;

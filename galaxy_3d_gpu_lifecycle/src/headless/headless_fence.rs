/// Headless fence: a counter advanced by the simulated GPU timeline

use std::any::Any;
use std::sync::{Arc, Mutex};
use crate::engine_err;
use crate::error::Result;
use crate::graphics_device::{Fence, FenceEvent};
use crate::headless::headless_device::DeviceState;

struct FenceInner {
    completed: u64,
    waiters: Vec<(u64, Arc<FenceEvent>)>,
}

/// Completion state shared between a fence and the signals targeting it
pub(crate) struct FenceState {
    inner: Mutex<FenceInner>,
}

impl FenceState {
    fn new(initial_value: u64) -> Self {
        Self {
            inner: Mutex::new(FenceInner { completed: initial_value, waiters: Vec::new() }),
        }
    }

    /// Raise the completed value (never lowers it) and fire reached waiters
    pub(crate) fn advance(&self, value: u64) {
        let fired: Vec<Arc<FenceEvent>> = {
            let mut inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            inner.completed = inner.completed.max(value);
            let completed = inner.completed;
            let mut fired = Vec::new();
            inner.waiters.retain(|(target, event)| {
                if *target <= completed {
                    fired.push(event.clone());
                    false
                } else {
                    true
                }
            });
            fired
        };
        for event in fired {
            event.set();
        }
    }

    fn completed(&self) -> u64 {
        self.inner.lock().map(|i| i.completed).unwrap_or(0)
    }

    fn add_waiter(&self, value: u64, event: &Arc<FenceEvent>) -> Result<()> {
        let mut inner = self.inner.lock()
            .map_err(|_| engine_err!("galaxy3d::headless", "Headless fence lock poisoned"))?;
        if inner.completed >= value {
            drop(inner);
            event.set();
        } else {
            inner.waiters.push((value, event.clone()));
        }
        Ok(())
    }
}

/// Fence of a `HeadlessDevice`
pub struct HeadlessFence {
    state: Arc<FenceState>,
    device: Arc<DeviceState>,
}

impl HeadlessFence {
    pub(crate) fn new(initial_value: u64, device: Arc<DeviceState>) -> Self {
        Self { state: Arc::new(FenceState::new(initial_value)), device }
    }

    pub(crate) fn shared_state(&self) -> Arc<FenceState> {
        self.state.clone()
    }
}

impl Fence for HeadlessFence {
    fn completed_value(&self) -> u64 {
        if self.device.removed_reason().is_some() {
            return u64::MAX;
        }
        self.state.completed()
    }

    fn set_event_on_completion(&self, value: u64, event: &Arc<FenceEvent>) -> Result<()> {
        if self.device.removed_reason().is_some() {
            event.set();
            return Ok(());
        }
        self.state.add_waiter(value, event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

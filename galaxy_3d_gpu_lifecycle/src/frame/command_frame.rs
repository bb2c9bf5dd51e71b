/// CommandFrame - one frame in flight: command allocator, command list and fence value

use std::sync::Arc;
use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{
    CommandAllocator, CommandList, CommandListType, Fence, FenceEvent, GraphicsDevice,
};

/// Recording resources of one frame in flight
///
/// The command allocator is reset only after the GPU reached `fence_value`,
/// the value signaled after this frame's last submission (0 before the first).
pub struct CommandFrame {
    allocator: Box<dyn CommandAllocator>,
    command_list: Box<dyn CommandList>,
    fence_value: u64,
}

impl CommandFrame {
    /// Create the allocator and the (closed) command list
    pub fn new(device: &dyn GraphicsDevice, list_type: CommandListType) -> Result<Self> {
        let allocator = device.create_command_allocator(list_type)?;
        let command_list = device.create_command_list(list_type, allocator.as_ref())?;
        Ok(Self {
            allocator,
            command_list,
            fence_value: 0,
        })
    }

    /// Fence value marking this frame's last submission
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub(crate) fn set_fence_value(&mut self, value: u64) {
        self.fence_value = value;
    }

    pub fn command_list(&self) -> &dyn CommandList {
        self.command_list.as_ref()
    }

    pub fn command_list_mut(&mut self) -> &mut dyn CommandList {
        self.command_list.as_mut()
    }

    /// Reclaim the allocator and reopen the command list
    ///
    /// The caller must have waited for this frame first.
    pub fn reset(&mut self) -> Result<()> {
        self.allocator.reset()?;
        self.command_list.reset(self.allocator.as_ref())
    }

    /// Finish recording
    pub fn close(&mut self) -> Result<()> {
        self.command_list.close()
    }

    /// Block until `fence` reaches this frame's fence value
    ///
    /// # Arguments
    ///
    /// * `fence` - Fence signaled after each submission
    /// * `event` - Event armed on the fence while waiting
    /// * `timeout` - Maximum time per wait (`None` waits forever)
    ///
    /// # Returns
    ///
    /// `true` if the call had to block, `false` if the value was already reached
    pub fn wait(&self, fence: &dyn Fence, event: &Arc<FenceEvent>, timeout: Option<Duration>) -> Result<bool> {
        let mut blocked = false;
        while fence.completed_value() < self.fence_value {
            fence.set_event_on_completion(self.fence_value, event)?;
            event.wait(timeout)?;
            blocked = true;
        }
        Ok(blocked)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "command_frame_tests.rs"]
mod tests;

/// Headless command recording: allocators, lists and the submission queue

use std::any::Any;
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandAllocator, CommandList, CommandListType, CommandQueue, Fence, GpuDescriptorAddress,
};
use crate::headless::headless_device::DeviceState;
use crate::headless::headless_fence::HeadlessFence;
use crate::engine_err;

/// A command captured by a headless command list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    BindDescriptorTable {
        root_parameter: u32,
        base: GpuDescriptorAddress,
    },
    DrawInstanced {
        vertex_count: u32,
        instance_count: u32,
    },
}

/// Snapshot of one command list submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    pub list_type: CommandListType,
    pub commands: Vec<RecordedCommand>,
}

// ============================================================================
// HeadlessCommandAllocator
// ============================================================================

/// Command allocator of a `HeadlessDevice`
pub struct HeadlessCommandAllocator {
    list_type: CommandListType,
    reset_count: u64,
}

impl HeadlessCommandAllocator {
    pub(crate) fn new(list_type: CommandListType) -> Self {
        Self { list_type, reset_count: 0 }
    }

    /// Number of times the allocator was reset
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }
}

impl CommandAllocator for HeadlessCommandAllocator {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn reset(&mut self) -> Result<()> {
        self.reset_count += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// HeadlessCommandList
// ============================================================================

/// Command list of a `HeadlessDevice`, recording into a vector
pub struct HeadlessCommandList {
    list_type: CommandListType,
    recording: bool,
    commands: Vec<RecordedCommand>,
}

impl HeadlessCommandList {
    pub(crate) fn new(list_type: CommandListType) -> Self {
        Self { list_type, recording: false, commands: Vec::new() }
    }

    /// Commands recorded since the last reset
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    fn record(&mut self, command: RecordedCommand) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidOperation(
                "Cannot record into a closed command list".to_string()
            ));
        }
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for HeadlessCommandList {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn reset(&mut self, allocator: &dyn CommandAllocator) -> Result<()> {
        if self.recording {
            return Err(Error::InvalidOperation(
                "Cannot reset a command list that is still recording".to_string()
            ));
        }
        if allocator.list_type() != self.list_type {
            return Err(Error::InvalidOperation(format!(
                "{:?} command list cannot use a {:?} allocator", self.list_type, allocator.list_type()
            )));
        }
        self.commands.clear();
        self.recording = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidOperation("Command list is already closed".to_string()));
        }
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn bind_descriptor_table(&mut self, root_parameter: u32, base: GpuDescriptorAddress) -> Result<()> {
        self.record(RecordedCommand::BindDescriptorTable { root_parameter, base })
    }

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32) -> Result<()> {
        self.record(RecordedCommand::DrawInstanced { vertex_count, instance_count })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// HeadlessCommandQueue
// ============================================================================

/// Command queue of a `HeadlessDevice`
pub struct HeadlessCommandQueue {
    list_type: CommandListType,
    device: Arc<DeviceState>,
}

impl HeadlessCommandQueue {
    pub(crate) fn new(list_type: CommandListType, device: Arc<DeviceState>) -> Self {
        Self { list_type, device }
    }
}

impl CommandQueue for HeadlessCommandQueue {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn submit(&self, command_list: &dyn CommandList) -> Result<()> {
        let list = command_list.as_any().downcast_ref::<HeadlessCommandList>()
            .ok_or_else(|| engine_err!("galaxy3d::headless",
                "Headless queue can only execute headless command lists"))?;
        if list.is_recording() {
            return Err(Error::InvalidOperation(
                "Cannot submit a command list that is still recording".to_string()
            ));
        }
        if list.list_type != self.list_type {
            return Err(Error::InvalidOperation(format!(
                "{:?} queue cannot execute a {:?} command list", self.list_type, list.list_type
            )));
        }
        self.device.record_submission(SubmittedBatch {
            list_type: list.list_type,
            commands: list.commands.clone(),
        })
    }

    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()> {
        let fence = fence.as_any().downcast_ref::<HeadlessFence>()
            .ok_or_else(|| engine_err!("galaxy3d::headless",
                "Headless queue can only signal headless fences"))?;
        self.device.enqueue_signal(fence.shared_state(), value)
    }
}

/// Command recording and submission traits

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::{Fence, GpuDescriptorAddress};

/// Type of command list, and of the queue that executes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandListType {
    /// Graphics + compute + copy
    Direct,
    /// Compute + copy
    Compute,
    /// Copy only
    Copy,
}

/// Backing memory for recorded commands
///
/// Exclusively owned by one command frame. Resetting reclaims every command
/// recorded through it, so it must only happen once the GPU finished
/// executing them.
pub trait CommandAllocator: Send + Sync {
    /// Type of command lists this allocator backs
    fn list_type(&self) -> CommandListType;

    /// Reclaim all memory used by previously recorded commands
    fn reset(&mut self) -> Result<()>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// A recordable command buffer
///
/// Lists start closed. `reset` opens them for recording, `close` finishes
/// recording so the list can be submitted.
pub trait CommandList: Send + Sync {
    /// Type of this command list
    fn list_type(&self) -> CommandListType;

    /// Reopen the list for recording, backed by `allocator`
    fn reset(&mut self, allocator: &dyn CommandAllocator) -> Result<()>;

    /// Finish recording
    fn close(&mut self) -> Result<()>;

    /// Whether the list is currently open for recording
    fn is_recording(&self) -> bool;

    /// Bind a descriptor table starting at `base` to a root parameter slot
    ///
    /// # Arguments
    ///
    /// * `root_parameter` - Root parameter index
    /// * `base` - GPU address of the first descriptor of the table
    fn bind_descriptor_table(&mut self, root_parameter: u32, base: GpuDescriptorAddress) -> Result<()>;

    /// Draw non-indexed, instanced primitives
    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32) -> Result<()>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// Submission queue for one command list type
///
/// Submissions execute in the order they are issued, and a fence signal
/// completes only after every previously submitted list.
pub trait CommandQueue: Send + Sync {
    /// Type of command lists this queue executes
    fn list_type(&self) -> CommandListType;

    /// Submit a closed command list for execution
    fn submit(&self, command_list: &dyn CommandList) -> Result<()>;

    /// Signal `fence` with `value` once all prior submissions completed
    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()>;
}

/// GraphicsDevice trait - factory for every device object the core consumes

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    CommandAllocator, CommandList, CommandListType, CommandQueue,
    DescriptorHeapFlags, DescriptorKind, DeviceDescriptorHeap, Fence,
};

/// Hardware limits relevant to descriptor heap sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum number of descriptors in any heap
    pub max_descriptor_heap_size: u32,
    /// Maximum number of descriptors in a sampler heap
    pub max_sampler_heap_size: u32,
}

impl Default for DeviceLimits {
    /// Resource binding tier 1 limits
    fn default() -> Self {
        Self {
            max_descriptor_heap_size: 1_000_000,
            max_sampler_heap_size: 2048,
        }
    }
}

/// Graphics device
///
/// Central factory for descriptor heaps, command recording objects, queues
/// and fences. Implemented by backends (e.g., `HeadlessDevice`).
pub trait GraphicsDevice: Send + Sync {
    /// Device limits
    fn limits(&self) -> DeviceLimits;

    /// Create a descriptor heap
    ///
    /// # Arguments
    ///
    /// * `kind` - Kind of descriptors the heap stores
    /// * `capacity` - Number of descriptor slots
    /// * `flags` - Creation flags (shader visibility)
    fn create_descriptor_heap(
        &self,
        kind: DescriptorKind,
        capacity: u32,
        flags: DescriptorHeapFlags,
    ) -> Result<Box<dyn DeviceDescriptorHeap>>;

    /// Distance in bytes between two consecutive descriptors of `kind`
    fn descriptor_increment_size(&self, kind: DescriptorKind) -> u32;

    /// Create a command allocator
    fn create_command_allocator(&self, list_type: CommandListType) -> Result<Box<dyn CommandAllocator>>;

    /// Create a command list, initially closed
    ///
    /// # Arguments
    ///
    /// * `list_type` - Command list type (must match the allocator)
    /// * `allocator` - Allocator that initially backs the list
    fn create_command_list(
        &self,
        list_type: CommandListType,
        allocator: &dyn CommandAllocator,
    ) -> Result<Box<dyn CommandList>>;

    /// Create the submission queue for `list_type`
    fn create_command_queue(&self, list_type: CommandListType) -> Result<Arc<dyn CommandQueue>>;

    /// Create a fence starting at `initial_value`
    fn create_fence(&self, initial_value: u64) -> Result<Arc<dyn Fence>>;
}

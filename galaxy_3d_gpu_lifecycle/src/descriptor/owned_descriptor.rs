/// OwnedDescriptor - a descriptor slot released when its owner goes away

use std::sync::Arc;
use crate::descriptor::{DescriptorHandle, DescriptorHeapAllocator};
use crate::error::Result;
use crate::graphics_device::{CpuDescriptorAddress, DescriptorKind, GpuDescriptorAddress};
use crate::engine_error;

/// A descriptor handle tied to its allocator
///
/// Call `dispose` to release it and observe failures, or let it drop: the
/// slot is then freed implicitly and failures are logged. Either way the
/// slot goes through the allocator's deferred-free path.
pub struct OwnedDescriptor {
    handle: DescriptorHandle,
    allocator: Arc<DescriptorHeapAllocator>,
}

impl OwnedDescriptor {
    pub(crate) fn new(handle: DescriptorHandle, allocator: Arc<DescriptorHeapAllocator>) -> Self {
        Self { handle, allocator }
    }

    /// Underlying handle
    pub fn handle(&self) -> &DescriptorHandle {
        &self.handle
    }

    pub fn kind(&self) -> DescriptorKind {
        self.handle.kind()
    }

    pub fn index(&self) -> u32 {
        self.handle.index()
    }

    pub fn cpu_address(&self) -> CpuDescriptorAddress {
        self.handle.cpu_address()
    }

    pub fn gpu_address(&self) -> Option<GpuDescriptorAddress> {
        self.handle.gpu_address()
    }

    /// Release the slot now
    pub fn dispose(mut self) -> Result<()> {
        let handle = self.handle.take();
        self.allocator.free(handle)
    }
}

impl Drop for OwnedDescriptor {
    fn drop(&mut self) {
        if self.handle.is_released() {
            return;
        }
        let handle = self.handle.take();
        let index = handle.index();
        if let Err(e) = self.allocator.free(handle) {
            engine_error!("galaxy3d::OwnedDescriptor",
                "Failed to release {} slot {} on drop: {}", self.handle.kind().short_name(), index, e);
        }
    }
}

impl std::fmt::Debug for OwnedDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedDescriptor")
            .field("handle", &self.handle)
            .finish()
    }
}

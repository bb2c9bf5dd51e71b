/// Headless descriptor heap: a synthetic address range registered on the device

use std::sync::Arc;
use crate::graphics_device::{
    CpuDescriptorAddress, DescriptorHeapFlags, DescriptorKind, DeviceDescriptorHeap,
    GpuDescriptorAddress,
};
use crate::headless::headless_device::{DeviceState, HeapKey};

/// Descriptor heap of a `HeadlessDevice`
///
/// Unregisters itself from the device when dropped.
pub struct HeadlessDescriptorHeap {
    key: HeapKey,
    kind: DescriptorKind,
    capacity: u32,
    flags: DescriptorHeapFlags,
    cpu_start: CpuDescriptorAddress,
    gpu_start: Option<GpuDescriptorAddress>,
    device: Arc<DeviceState>,
}

impl HeadlessDescriptorHeap {
    pub(crate) fn new(
        key: HeapKey,
        kind: DescriptorKind,
        capacity: u32,
        flags: DescriptorHeapFlags,
        cpu_start: CpuDescriptorAddress,
        gpu_start: Option<GpuDescriptorAddress>,
        device: Arc<DeviceState>,
    ) -> Self {
        Self { key, kind, capacity, flags, cpu_start, gpu_start, device }
    }

    /// Registry key of this heap on its device
    pub fn key(&self) -> HeapKey {
        self.key
    }
}

impl DeviceDescriptorHeap for HeadlessDescriptorHeap {
    fn kind(&self) -> DescriptorKind {
        self.kind
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn flags(&self) -> DescriptorHeapFlags {
        self.flags
    }

    fn cpu_start(&self) -> CpuDescriptorAddress {
        self.cpu_start
    }

    fn gpu_start(&self) -> Option<GpuDescriptorAddress> {
        self.gpu_start
    }
}

impl Drop for HeadlessDescriptorHeap {
    fn drop(&mut self) {
        self.device.release_heap(self.key);
    }
}

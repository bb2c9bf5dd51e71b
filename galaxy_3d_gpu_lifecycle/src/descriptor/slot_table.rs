/// Fixed-capacity descriptor slot table with its free-index stack

use crate::descriptor::{DescriptorHandle, TableId};
use crate::error::{Error, Result};
use crate::graphics_device::{
    CpuDescriptorAddress, DescriptorKind, DeviceDescriptorHeap, GpuDescriptorAddress,
};

/// Slots of one device descriptor heap
///
/// `free_indices[size..capacity]` are the indices not handed out. `claim`
/// takes `free_indices[size]` and `reclaim` writes the returned index back
/// at `free_indices[size]` after decrementing `size`.
pub(crate) struct DescriptorSlotTable {
    heap: Box<dyn DeviceDescriptorHeap>,
    table_id: TableId,
    capacity: u32,
    size: u32,
    free_indices: Vec<u32>,
    live: Vec<bool>,
    cpu_base: CpuDescriptorAddress,
    gpu_base: Option<GpuDescriptorAddress>,
    stride: u32,
}

impl DescriptorSlotTable {
    /// Wrap a freshly created heap; indices are handed out in ascending order
    pub fn new(heap: Box<dyn DeviceDescriptorHeap>, stride: u32) -> Self {
        let capacity = heap.capacity();
        Self {
            table_id: TableId::next(),
            capacity,
            size: 0,
            free_indices: (0..capacity).collect(),
            live: vec![false; capacity as usize],
            cpu_base: heap.cpu_start(),
            gpu_base: heap.gpu_start(),
            stride,
            heap,
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn kind(&self) -> DescriptorKind {
        self.heap.kind()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn shader_visible(&self) -> bool {
        self.gpu_base.is_some()
    }

    /// Hand out the next free slot, or `None` when the table is full
    pub fn claim(&mut self) -> Option<DescriptorHandle> {
        if self.size >= self.capacity {
            return None;
        }
        let index = self.free_indices[self.size as usize];
        self.size += 1;
        self.live[index as usize] = true;

        Some(DescriptorHandle {
            table_id: self.table_id,
            kind: self.kind(),
            capacity: self.capacity,
            index,
            cpu: self.cpu_base.offset(index, self.stride),
            gpu: self.gpu_base.map(|base| base.offset(index, self.stride)),
        })
    }

    /// Check that `handle` designates a live slot of this table
    ///
    /// On success the slot stops being live and its index is returned; it
    /// only becomes claimable again through `reclaim`.
    pub fn release(&mut self, handle: &DescriptorHandle) -> Result<u32> {
        if handle.capacity == 0 {
            return Err(Error::InvalidOperation(format!(
                "{} handle is empty (capacity 0)", handle.kind.short_name()
            )));
        }
        if handle.table_id != self.table_id {
            return Err(Error::InvalidOperation(format!(
                "Handle from {} freed into {} {}",
                handle.table_id, self.kind().short_name(), self.table_id
            )));
        }
        if handle.cpu.is_null() {
            return Err(Error::InvalidOperation("Handle has a null CPU address".to_string()));
        }
        if handle.cpu < self.cpu_base {
            return Err(Error::InvalidOperation(format!(
                "Handle address {:#x} lies before heap base {:#x}", handle.cpu.0, self.cpu_base.0
            )));
        }
        let offset = handle.cpu.0 - self.cpu_base.0;
        if offset % u64::from(self.stride) != 0 {
            return Err(Error::InvalidOperation(format!(
                "Handle address {:#x} is not aligned to the {}-byte stride", handle.cpu.0, self.stride
            )));
        }
        let index = offset / u64::from(self.stride);
        if index >= u64::from(self.capacity) {
            return Err(Error::InvalidOperation(format!(
                "Handle index {} out of range for capacity {}", index, self.capacity
            )));
        }
        let index = index as u32;
        if !self.live[index as usize] {
            return Err(Error::InvalidOperation(format!(
                "Slot {} is not allocated (double free?)", index
            )));
        }

        self.live[index as usize] = false;
        Ok(index)
    }

    /// Put a released index back into circulation
    pub fn reclaim(&mut self, index: u32) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidOperation(format!(
                "Reclaiming slot {} from an empty {} table", index, self.kind().short_name()
            )));
        }
        self.size -= 1;
        self.free_indices[self.size as usize] = index;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_table_tests.rs"]
mod tests;

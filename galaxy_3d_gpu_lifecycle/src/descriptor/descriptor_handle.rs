/// Descriptor handles and the identity of the table that issued them

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::graphics_device::{CpuDescriptorAddress, DescriptorKind, GpuDescriptorAddress};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one slot table instance
///
/// A new id is drawn every time an allocator is (re)initialized, so handles
/// issued before a reinitialization are foreign to the new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

impl TableId {
    pub(crate) fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value (for logs)
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// A descriptor slot handed out by a `DescriptorHeapAllocator`
///
/// Handles are not `Clone`: `free` takes the handle by value, so the same
/// value cannot be released twice. Handles that outlive their table (after a
/// reinitialization) or that were built by hand are rejected by `free`.
#[derive(Debug, PartialEq, Eq)]
pub struct DescriptorHandle {
    pub(crate) table_id: TableId,
    pub(crate) kind: DescriptorKind,
    pub(crate) capacity: u32,
    pub(crate) index: u32,
    pub(crate) cpu: CpuDescriptorAddress,
    pub(crate) gpu: Option<GpuDescriptorAddress>,
}

impl DescriptorHandle {
    /// Identity of the issuing table
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Kind of the issuing heap
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Capacity of the issuing heap (0 once the handle was released)
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slot index in the heap
    pub fn index(&self) -> u32 {
        self.index
    }

    /// CPU address of the slot, used to write the descriptor
    pub fn cpu_address(&self) -> CpuDescriptorAddress {
        self.cpu
    }

    /// GPU address of the slot (shader-visible heaps only)
    pub fn gpu_address(&self) -> Option<GpuDescriptorAddress> {
        self.gpu
    }

    /// Whether the handle was emptied by `take`
    pub(crate) fn is_released(&self) -> bool {
        self.capacity == 0
    }

    /// Move the handle out, leaving an empty one (capacity 0, null address)
    /// that `free` rejects
    pub(crate) fn take(&mut self) -> DescriptorHandle {
        let empty = DescriptorHandle {
            table_id: self.table_id,
            kind: self.kind,
            capacity: 0,
            index: 0,
            cpu: CpuDescriptorAddress::NULL,
            gpu: None,
        };
        std::mem::replace(self, empty)
    }
}

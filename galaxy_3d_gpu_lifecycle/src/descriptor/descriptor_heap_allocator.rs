/// DescriptorHeapAllocator - slot table + deferred-free ring for one descriptor kind
///
/// Slots are handed out immediately, but a freed slot only returns to
/// circulation once the frame that was recording when it was freed has been
/// confirmed retired by its fence. Until then the GPU may still read it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::validate_heap_capacity;
use crate::descriptor::{DeferredFreeRing, DescriptorHandle, OwnedDescriptor};
use crate::descriptor::slot_table::DescriptorSlotTable;
use crate::error::{Error, Result};
use crate::frame::FrameCursor;
use crate::graphics_device::{DescriptorHeapFlags, DescriptorKind, GraphicsDevice};
use crate::{engine_bail, engine_debug, engine_err, engine_error, engine_trace};

const SOURCE: &str = "galaxy3d::DescriptorHeapAllocator";

struct AllocatorState {
    table: Option<DescriptorSlotTable>,
    ring: DeferredFreeRing,
}

/// Descriptor allocator for one `DescriptorKind`
///
/// Thread-safe: every operation serializes on one internal mutex, so
/// resources may be created and destroyed from any thread while the frame
/// loop runs.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::descriptor::DescriptorHeapAllocator;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::device::DescriptorKind;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::frame::FrameCursor;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::headless::{HeadlessDevice, CompletionMode};
///
/// let device = Arc::new(HeadlessDevice::new(CompletionMode::Immediate));
/// let cursor = Arc::new(FrameCursor::new(3).unwrap());
/// let srv = DescriptorHeapAllocator::new(DescriptorKind::ResourceView, device, cursor);
///
/// srv.initialize(128, true).unwrap();
/// let handle = srv.allocate().unwrap();
/// assert_eq!(handle.index(), 0);
///
/// srv.free(handle).unwrap();
/// assert_eq!(srv.size(), 1); // still held until the frame retires
/// ```
pub struct DescriptorHeapAllocator {
    kind: DescriptorKind,
    device: Arc<dyn GraphicsDevice>,
    cursor: Arc<FrameCursor>,
    state: Mutex<AllocatorState>,
}

impl DescriptorHeapAllocator {
    /// Create an uninitialized allocator
    ///
    /// # Arguments
    ///
    /// * `kind` - Kind of descriptors served
    /// * `device` - Device that creates the backing heap
    /// * `cursor` - Frame cursor deciding which deferred-free bin receives frees
    pub fn new(kind: DescriptorKind, device: Arc<dyn GraphicsDevice>, cursor: Arc<FrameCursor>) -> Self {
        let ring = DeferredFreeRing::new(cursor.frame_count());
        Self {
            kind,
            device,
            cursor,
            state: Mutex::new(AllocatorState { table: None, ring }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AllocatorState>> {
        self.state.lock().map_err(|_| engine_err!(SOURCE,
            "{} allocator lock poisoned", self.kind.short_name()))
    }

    /// Create the backing device heap
    ///
    /// RTV and DSV heaps are never shader visible, whatever `shader_visible` says.
    ///
    /// # Errors
    ///
    /// * `Error::OutOfRange` - capacity is zero or above the device limit of the kind
    /// * `Error::InvalidOperation` - frees from the previous heap are still pending
    /// * device errors from heap creation
    pub fn initialize(&self, capacity: u32, shader_visible: bool) -> Result<()> {
        validate_heap_capacity(self.kind, capacity, &self.device.limits())?;

        let mut state = self.lock()?;
        if !state.ring.is_empty() {
            let pending = state.ring.total_len();
            engine_error!(SOURCE, "Reinitializing {} heap with {} pending frees",
                self.kind.short_name(), pending);
            return Err(Error::InvalidOperation(format!(
                "Cannot reinitialize {} heap: {} frees still pending", self.kind.short_name(), pending
            )));
        }

        let visible = shader_visible && self.kind.allows_shader_visibility();
        if shader_visible && !visible {
            engine_debug!(SOURCE, "{} heaps are never shader visible, ignoring request",
                self.kind.short_name());
        }
        let flags = if visible { DescriptorHeapFlags::SHADER_VISIBLE } else { DescriptorHeapFlags::empty() };

        let stride = self.device.descriptor_increment_size(self.kind);
        if stride == 0 {
            engine_bail!(SOURCE, "Device reported a zero increment size for {} descriptors",
                self.kind.short_name());
        }
        let heap = self.device.create_descriptor_heap(self.kind, capacity, flags)?;
        let table = DescriptorSlotTable::new(heap, stride);

        engine_debug!(SOURCE, "Initialized {} heap {}: {} slots, stride {}, shader visible: {}",
            self.kind.short_name(), table.table_id(), capacity, table.stride(), table.shader_visible());

        state.table = Some(table);
        Ok(())
    }

    /// Hand out a descriptor slot
    ///
    /// # Errors
    ///
    /// * `Error::DescriptorHeapDoesNotExist` - `initialize` was never called
    /// * `Error::CapacityExceeded` - every slot is allocated or waiting to be reclaimed
    pub fn allocate(&self) -> Result<DescriptorHandle> {
        let mut state = self.lock()?;
        let table = match state.table.as_mut() {
            Some(table) => table,
            None => {
                engine_error!(SOURCE, "Allocation from {} heap before initialization",
                    self.kind.short_name());
                return Err(Error::DescriptorHeapDoesNotExist(self.kind));
            }
        };

        match table.claim() {
            Some(handle) => {
                engine_trace!(SOURCE, "Allocated {} slot {}", self.kind.short_name(), handle.index());
                Ok(handle)
            }
            None => {
                let capacity = table.capacity();
                engine_error!(SOURCE, "{} heap is full ({} descriptors)",
                    self.kind.short_name(), capacity);
                Err(Error::CapacityExceeded { kind: self.kind, capacity })
            }
        }
    }

    /// Hand out a descriptor slot released automatically when the owner drops
    pub fn allocate_owned(self: &Arc<Self>) -> Result<OwnedDescriptor> {
        let handle = self.allocate()?;
        Ok(OwnedDescriptor::new(handle, Arc::clone(self)))
    }

    /// Release a descriptor slot
    ///
    /// The slot goes to the deferred-free bin of the frame most recently
    /// begun and is reclaimed by `process_deferred_free` for that frame.
    ///
    /// # Errors
    ///
    /// `Error::InvalidOperation` if the handle is empty, foreign to this
    /// heap, corrupted or already freed.
    pub fn free(&self, handle: DescriptorHandle) -> Result<()> {
        let mut state = self.lock()?;
        let state = &mut *state;

        let released = match state.table.as_mut() {
            Some(table) => table.release(&handle),
            None => Err(Error::InvalidOperation(format!(
                "Free into {} heap that was never initialized", self.kind.short_name()
            ))),
        };
        let index = match released {
            Ok(index) => index,
            Err(err) => {
                engine_error!(SOURCE, "Rejected free of {} slot {}: {}",
                    self.kind.short_name(), handle.index(), err);
                return Err(err);
            }
        };

        let frame = self.cursor.free_bin();
        if !state.ring.push(frame, index) {
            return Err(Error::InvalidOperation(format!(
                "Frame {} has no deferred-free bin ({} frames)", frame, state.ring.frame_count()
            )));
        }
        engine_trace!(SOURCE, "Deferred free of {} slot {} until frame {} retires",
            self.kind.short_name(), index, frame);
        Ok(())
    }

    /// Return the slots freed during `frame_index` to circulation
    ///
    /// Must only be called once the GPU work of that frame has retired.
    pub fn process_deferred_free(&self, frame_index: u32) -> Result<()> {
        let mut state = self.lock()?;
        if frame_index >= state.ring.frame_count() {
            return Err(Error::InvalidOperation(format!(
                "Frame index {} out of range ({} frames)", frame_index, state.ring.frame_count()
            )));
        }

        let indices = state.ring.drain(frame_index);
        if indices.is_empty() {
            return Ok(());
        }
        let table = state.table.as_mut().ok_or_else(|| Error::InvalidOperation(format!(
            "{} deferred frees pending without a heap", self.kind.short_name()
        )))?;
        for &index in &indices {
            table.reclaim(index)?;
        }

        engine_trace!(SOURCE, "Reclaimed {} {} slots for frame {}",
            indices.len(), self.kind.short_name(), frame_index);
        Ok(())
    }

    // ===== DIAGNOSTICS =====

    /// Kind of descriptors served
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Frame cursor this allocator follows
    pub fn frame_cursor(&self) -> &Arc<FrameCursor> {
        &self.cursor
    }

    /// Heap capacity (0 before `initialize`)
    pub fn capacity(&self) -> u32 {
        self.read(|state| state.table.as_ref().map_or(0, |t| t.capacity()))
    }

    /// Slots allocated or waiting to be reclaimed
    pub fn size(&self) -> u32 {
        self.read(|state| state.table.as_ref().map_or(0, |t| t.size()))
    }

    /// Whether the heap is shader visible
    pub fn shader_visible(&self) -> bool {
        self.read(|state| state.table.as_ref().is_some_and(|t| t.shader_visible()))
    }

    /// Whether `initialize` succeeded at least once
    pub fn is_initialized(&self) -> bool {
        self.read(|state| state.table.is_some())
    }

    /// Slots waiting in the deferred-free bin of `frame`
    pub fn pending_free_count(&self, frame: u32) -> usize {
        self.read(|state| state.ring.len(frame))
    }

    /// Slots waiting in all deferred-free bins
    pub fn total_pending_frees(&self) -> usize {
        self.read(|state| state.ring.total_len())
    }

    fn read<T>(&self, f: impl FnOnce(&AllocatorState) -> T) -> T {
        match self.state.lock() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "descriptor_heap_allocator_tests.rs"]
mod tests;

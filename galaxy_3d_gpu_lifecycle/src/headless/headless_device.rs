/// HeadlessDevice - CPU-only implementation of GraphicsDevice
///
/// Runs the whole core without a GPU. Descriptor heaps get synthetic address
/// ranges, command lists record into plain vectors, and the "GPU timeline" is
/// driven either immediately (every signal completes at once) or manually by
/// the caller, which makes fence retirement fully deterministic in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandAllocator, CommandList, CommandListType, CommandQueue,
    CpuDescriptorAddress, DescriptorHeapFlags, DescriptorKind, DeviceDescriptorHeap,
    DeviceLimits, Fence, GpuDescriptorAddress, GraphicsDevice,
};
use crate::headless::headless_command::{
    HeadlessCommandAllocator, HeadlessCommandList, HeadlessCommandQueue, SubmittedBatch,
};
use crate::headless::headless_fence::{FenceState, HeadlessFence};
use crate::headless::headless_heap::HeadlessDescriptorHeap;
use crate::{engine_debug, engine_err, engine_warn};

const SOURCE: &str = "galaxy3d::headless";

new_key_type! {
    /// Stable key of a live headless descriptor heap
    pub struct HeapKey;
}

/// First CPU address handed out; keeps slot addresses away from null
const CPU_ADDRESS_BASE: u64 = 0x0000_1000;
/// First GPU address handed out for shader-visible heaps
const GPU_ADDRESS_BASE: u64 = 0x0001_0000_0000;
/// Gap left between two heaps' address ranges
const HEAP_ADDRESS_GUARD: u64 = 0x1000;
/// Submitted batches kept for inspection; older ones are discarded
pub const MAX_RETAINED_BATCHES: usize = 1024;

/// How the simulated GPU retires fence signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// A signal completes as soon as it is enqueued
    Immediate,
    /// Signals stay pending until `retire_next` / `retire_all`
    Manual,
}

/// Creation parameters for a headless device
#[derive(Debug, Clone)]
pub struct HeadlessDeviceDesc {
    /// Reported device limits
    pub limits: DeviceLimits,
    /// Fence retirement mode
    pub completion_mode: CompletionMode,
    /// Descriptor increment size per kind, in bytes
    pub increment_sizes: FxHashMap<DescriptorKind, u32>,
}

impl Default for HeadlessDeviceDesc {
    fn default() -> Self {
        let mut increment_sizes = FxHashMap::default();
        increment_sizes.insert(DescriptorKind::RenderTargetView, 32);
        increment_sizes.insert(DescriptorKind::DepthStencilView, 16);
        increment_sizes.insert(DescriptorKind::ResourceView, 64);
        increment_sizes.insert(DescriptorKind::Sampler, 32);
        Self {
            limits: DeviceLimits::default(),
            completion_mode: CompletionMode::Immediate,
            increment_sizes,
        }
    }
}

/// Bookkeeping for a live heap
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeapRecord {
    pub kind: DescriptorKind,
    pub capacity: u32,
}

/// A fence signal enqueued on a queue but not yet reached by the "GPU"
struct PendingSignal {
    fence: Arc<FenceState>,
    value: u64,
}

/// Everything the simulated GPU has been asked to do
#[derive(Default)]
struct Timeline {
    pending: VecDeque<PendingSignal>,
    batches: VecDeque<SubmittedBatch>,
    submission_count: u64,
}

/// State shared by the device and every object it created
pub(crate) struct DeviceState {
    limits: DeviceLimits,
    completion_mode: CompletionMode,
    increment_sizes: FxHashMap<DescriptorKind, u32>,
    heaps: Mutex<SlotMap<HeapKey, HeapRecord>>,
    next_cpu_address: AtomicU64,
    next_gpu_address: AtomicU64,
    removed_reason: Mutex<Option<String>>,
    fail_next_submit: AtomicBool,
    timeline: Mutex<Timeline>,
}

impl DeviceState {
    fn lock_timeline(&self) -> Result<MutexGuard<'_, Timeline>> {
        self.timeline.lock()
            .map_err(|_| engine_err!(SOURCE, "Headless timeline lock poisoned"))
    }

    /// Reason the device was removed, if it was
    pub(crate) fn removed_reason(&self) -> Option<String> {
        match self.removed_reason.lock() {
            Ok(reason) => reason.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        match self.removed_reason() {
            Some(reason) => Err(Error::DeviceRemoved(reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn release_heap(&self, key: HeapKey) {
        if let Ok(mut heaps) = self.heaps.lock() {
            heaps.remove(key);
        }
    }

    pub(crate) fn record_submission(&self, batch: SubmittedBatch) -> Result<()> {
        self.ensure_alive()?;
        if self.fail_next_submit.swap(false, Ordering::SeqCst) {
            return Err(Error::DeviceRemoved("Queue rejected the submission".to_string()));
        }
        let mut timeline = self.lock_timeline()?;
        if timeline.batches.len() == MAX_RETAINED_BATCHES {
            timeline.batches.pop_front();
        }
        timeline.batches.push_back(batch);
        timeline.submission_count += 1;
        Ok(())
    }

    pub(crate) fn enqueue_signal(&self, fence: Arc<FenceState>, value: u64) -> Result<()> {
        self.ensure_alive()?;
        match self.completion_mode {
            CompletionMode::Immediate => fence.advance(value),
            CompletionMode::Manual => {
                self.lock_timeline()?.pending.push_back(PendingSignal { fence, value });
            }
        }
        Ok(())
    }
}

/// CPU-only graphics device
///
/// # Example
///
/// ```
/// use galaxy_3d_gpu_lifecycle::galaxy3d::headless::{HeadlessDevice, CompletionMode};
/// use galaxy_3d_gpu_lifecycle::galaxy3d::device::{CommandListType, GraphicsDevice};
///
/// let device = HeadlessDevice::new(CompletionMode::Manual);
/// let queue = device.create_command_queue(CommandListType::Direct).unwrap();
/// let fence = device.create_fence(0).unwrap();
///
/// queue.signal(fence.as_ref(), 1).unwrap();
/// assert_eq!(fence.completed_value(), 0);
///
/// device.retire_all();
/// assert_eq!(fence.completed_value(), 1);
/// ```
#[derive(Clone)]
pub struct HeadlessDevice {
    state: Arc<DeviceState>,
}

impl HeadlessDevice {
    /// Create a device with default limits and increment sizes
    pub fn new(completion_mode: CompletionMode) -> Self {
        Self::with_desc(HeadlessDeviceDesc {
            completion_mode,
            ..HeadlessDeviceDesc::default()
        })
    }

    /// Create a device from a full descriptor
    pub fn with_desc(desc: HeadlessDeviceDesc) -> Self {
        engine_debug!(SOURCE,
            "Creating headless device ({:?} completion)", desc.completion_mode);
        Self {
            state: Arc::new(DeviceState {
                limits: desc.limits,
                completion_mode: desc.completion_mode,
                increment_sizes: desc.increment_sizes,
                heaps: Mutex::new(SlotMap::with_key()),
                next_cpu_address: AtomicU64::new(CPU_ADDRESS_BASE),
                next_gpu_address: AtomicU64::new(GPU_ADDRESS_BASE),
                removed_reason: Mutex::new(None),
                fail_next_submit: AtomicBool::new(false),
                timeline: Mutex::new(Timeline::default()),
            }),
        }
    }

    /// Fence retirement mode
    pub fn completion_mode(&self) -> CompletionMode {
        self.state.completion_mode
    }

    /// Let the "GPU" reach the oldest pending fence signal
    ///
    /// Returns the signaled value, or `None` when nothing is pending.
    pub fn retire_next(&self) -> Option<u64> {
        let signal = self.state.timeline.lock().ok()?.pending.pop_front()?;
        signal.fence.advance(signal.value);
        Some(signal.value)
    }

    /// Let the "GPU" reach every pending fence signal, in order
    ///
    /// Returns the number of signals retired.
    pub fn retire_all(&self) -> usize {
        let mut retired = 0;
        while self.retire_next().is_some() {
            retired += 1;
        }
        retired
    }

    /// Number of fence signals the "GPU" has not reached yet
    pub fn pending_signal_count(&self) -> usize {
        self.state.timeline.lock().map(|t| t.pending.len()).unwrap_or(0)
    }

    /// Retained command list submissions, oldest first
    ///
    /// At most `MAX_RETAINED_BATCHES` are kept; long-running loops should
    /// drain them with `take_submitted_batches`.
    pub fn submitted_batches(&self) -> Vec<SubmittedBatch> {
        self.state.timeline.lock()
            .map(|t| t.batches.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return the retained submissions, oldest first
    pub fn take_submitted_batches(&self) -> Vec<SubmittedBatch> {
        match self.state.timeline.lock() {
            Ok(mut timeline) => Vec::from(std::mem::take(&mut timeline.batches)),
            Err(_) => Vec::new(),
        }
    }

    /// Discard the retained submissions
    pub fn clear_submitted_batches(&self) {
        if let Ok(mut timeline) = self.state.timeline.lock() {
            timeline.batches.clear();
        }
    }

    /// Number of command lists submitted since creation, retained or not
    pub fn submission_count(&self) -> u64 {
        self.state.timeline.lock().map(|t| t.submission_count).unwrap_or(0)
    }

    /// Number of descriptor heaps currently alive
    pub fn live_heap_count(&self) -> usize {
        self.state.heaps.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// Total slots of the live heaps of `kind`
    pub fn live_descriptor_slots(&self, kind: DescriptorKind) -> u64 {
        self.state.heaps.lock()
            .map(|heaps| heaps.values()
                .filter(|record| record.kind == kind)
                .map(|record| u64::from(record.capacity))
                .sum())
            .unwrap_or(0)
    }

    /// Make the next `submit` fail with `Error::DeviceRemoved`
    pub fn fail_next_submit(&self) {
        self.state.fail_next_submit.store(true, Ordering::SeqCst);
    }

    /// Simulate device removal
    ///
    /// Every later device, queue and fence call fails with
    /// `Error::DeviceRemoved`, and every fence reports `u64::MAX` as completed
    /// so no CPU thread stays blocked on work that will never finish.
    pub fn remove_device(&self, reason: &str) {
        engine_warn!(SOURCE, "Device removed: {}", reason);
        if let Ok(mut removed) = self.state.removed_reason.lock() {
            *removed = Some(reason.to_string());
        }
        let pending: Vec<PendingSignal> = match self.state.timeline.lock() {
            Ok(mut timeline) => timeline.pending.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for signal in pending {
            signal.fence.advance(u64::MAX);
        }
    }

    /// Whether `remove_device` was called
    pub fn is_removed(&self) -> bool {
        self.state.removed_reason().is_some()
    }

    fn reserve_range(counter: &AtomicU64, bytes: u64) -> u64 {
        counter.fetch_add(bytes + HEAP_ADDRESS_GUARD, Ordering::SeqCst)
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn limits(&self) -> DeviceLimits {
        self.state.limits
    }

    fn create_descriptor_heap(
        &self,
        kind: DescriptorKind,
        capacity: u32,
        flags: DescriptorHeapFlags,
    ) -> Result<Box<dyn DeviceDescriptorHeap>> {
        self.state.ensure_alive()?;

        let max = kind.max_heap_capacity(&self.state.limits);
        if capacity == 0 || capacity > max {
            return Err(Error::OutOfRange(format!(
                "{} heap capacity {} outside 1..={}", kind.short_name(), capacity, max
            )));
        }
        if flags.contains(DescriptorHeapFlags::SHADER_VISIBLE) && !kind.allows_shader_visibility() {
            return Err(Error::InvalidOperation(format!(
                "{} heaps cannot be shader visible", kind.short_name()
            )));
        }

        let stride = self.descriptor_increment_size(kind);
        let bytes = u64::from(capacity) * u64::from(stride);
        let cpu_start = CpuDescriptorAddress(Self::reserve_range(&self.state.next_cpu_address, bytes));
        let gpu_start = flags.contains(DescriptorHeapFlags::SHADER_VISIBLE)
            .then(|| GpuDescriptorAddress(Self::reserve_range(&self.state.next_gpu_address, bytes)));

        let key = self.state.heaps.lock()
            .map_err(|_| engine_err!(SOURCE, "Headless heap registry lock poisoned"))?
            .insert(HeapRecord { kind, capacity });

        engine_debug!(SOURCE,
            "Created {} heap: {} slots, cpu start {:#x}", kind.short_name(), capacity, cpu_start.0);

        Ok(Box::new(HeadlessDescriptorHeap::new(
            key, kind, capacity, flags, cpu_start, gpu_start, self.state.clone(),
        )))
    }

    fn descriptor_increment_size(&self, kind: DescriptorKind) -> u32 {
        self.state.increment_sizes.get(&kind).copied().unwrap_or(32)
    }

    fn create_command_allocator(&self, list_type: CommandListType) -> Result<Box<dyn CommandAllocator>> {
        self.state.ensure_alive()?;
        Ok(Box::new(HeadlessCommandAllocator::new(list_type)))
    }

    fn create_command_list(
        &self,
        list_type: CommandListType,
        allocator: &dyn CommandAllocator,
    ) -> Result<Box<dyn CommandList>> {
        self.state.ensure_alive()?;
        if allocator.list_type() != list_type {
            return Err(Error::InvalidOperation(format!(
                "{:?} command list cannot use a {:?} allocator", list_type, allocator.list_type()
            )));
        }
        Ok(Box::new(HeadlessCommandList::new(list_type)))
    }

    fn create_command_queue(&self, list_type: CommandListType) -> Result<Arc<dyn CommandQueue>> {
        self.state.ensure_alive()?;
        Ok(Arc::new(HeadlessCommandQueue::new(list_type, self.state.clone())))
    }

    fn create_fence(&self, initial_value: u64) -> Result<Arc<dyn Fence>> {
        self.state.ensure_alive()?;
        Ok(Arc::new(HeadlessFence::new(initial_value, self.state.clone())))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "headless_device_tests.rs"]
mod tests;

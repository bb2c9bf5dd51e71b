/// RenderingCommandUnit - round-robin frames in flight on one queue and one fence
///
/// `begin_frame` waits until the GPU is done with the frame about to be
/// reused, reclaims the descriptors freed while that frame was recorded,
/// and reopens its command list. `end_frame` submits the list and signals
/// the fence with the next value. `flush_frames` drains everything, for
/// shutdown or resize.

use std::sync::Arc;

use crate::config::FrameConfig;
use crate::descriptor::{DescriptorHeapAllocator, DescriptorHeaps};
use crate::error::{Error, Result};
use crate::frame::{CommandFrame, FrameCursor};
use crate::graphics_device::{CommandList, CommandQueue, Fence, FenceEvent, GraphicsDevice};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const SOURCE: &str = "galaxy3d::RenderingCommandUnit";

/// Frame loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Nothing recording; every submitted frame may still be in flight
    Idle,
    /// Between `begin_frame` and `end_frame`
    Recording,
    /// The last frame was submitted
    Submitted,
    /// A submission or signal failed; the device must be recreated
    Lost,
}

/// Frame loop statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of frames submitted to the queue
    pub frames_submitted: u64,
    /// Number of fence waits that actually blocked
    pub blocking_waits: u64,
}

/// Owner of the frames in flight, the submission queue and the frame fence
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::config::FrameConfig;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::descriptor::DescriptorHeapsBuilder;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::frame::RenderingCommandUnit;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::headless::{HeadlessDevice, CompletionMode};
///
/// let device = Arc::new(HeadlessDevice::new(CompletionMode::Immediate));
/// let mut unit = RenderingCommandUnit::new(device.as_ref(), FrameConfig::default()).unwrap();
/// let heaps = DescriptorHeapsBuilder::new(device.clone(), unit.frame_cursor().clone())
///     .build()
///     .unwrap();
/// unit.register_heaps(&heaps).unwrap();
///
/// unit.begin_frame().unwrap();
/// unit.command_list_mut().unwrap().draw_instanced(3, 1).unwrap();
/// unit.end_frame().unwrap();
///
/// unit.flush_frames().unwrap();
/// assert_eq!(unit.stats().frames_submitted, 1);
/// ```
pub struct RenderingCommandUnit {
    config: FrameConfig,
    queue: Arc<dyn CommandQueue>,
    fence: Arc<dyn Fence>,
    fence_event: Arc<FenceEvent>,
    frames: Vec<CommandFrame>,
    cursor: Arc<FrameCursor>,
    next_fence_value: u64,
    state: FrameState,
    allocators: Vec<Arc<DescriptorHeapAllocator>>,
    stats: FrameStats,
}

impl RenderingCommandUnit {
    /// Create the queue, the fence and `config.frame_count` command frames
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` for an invalid frame count, or the first device
    /// creation error.
    pub fn new(device: &dyn GraphicsDevice, config: FrameConfig) -> Result<Self> {
        config.validate()?;

        let queue = device.create_command_queue(config.list_type)?;
        let fence = device.create_fence(0)?;
        let frames = (0..config.frame_count)
            .map(|_| CommandFrame::new(device, config.list_type))
            .collect::<Result<Vec<_>>>()?;
        let cursor = Arc::new(FrameCursor::new(config.frame_count)?);

        engine_info!(SOURCE, "Created {} frames in flight on a {:?} queue",
            config.frame_count, config.list_type);

        Ok(Self {
            config,
            queue,
            fence,
            fence_event: Arc::new(FenceEvent::new()),
            frames,
            cursor,
            next_fence_value: 0,
            state: FrameState::Idle,
            allocators: Vec::new(),
            stats: FrameStats::default(),
        })
    }

    /// Frame cursor to hand to the descriptor allocators
    pub fn frame_cursor(&self) -> &Arc<FrameCursor> {
        &self.cursor
    }

    /// Reclaim the deferred frees of `allocator` as frames retire
    ///
    /// # Errors
    ///
    /// `Error::InvalidOperation` if the allocator follows another frame
    /// cursor or is already registered.
    pub fn register_allocator(&mut self, allocator: Arc<DescriptorHeapAllocator>) -> Result<()> {
        if !Arc::ptr_eq(allocator.frame_cursor(), &self.cursor) {
            return Err(Error::InvalidOperation(format!(
                "{} allocator follows a different frame cursor", allocator.kind().short_name()
            )));
        }
        if self.allocators.iter().any(|a| Arc::ptr_eq(a, &allocator)) {
            return Err(Error::InvalidOperation(format!(
                "{} allocator is already registered", allocator.kind().short_name()
            )));
        }
        engine_debug!(SOURCE, "Registered {} allocator", allocator.kind().short_name());
        self.allocators.push(allocator);
        Ok(())
    }

    /// Register the four allocators of `heaps`
    pub fn register_heaps(&mut self, heaps: &DescriptorHeaps) -> Result<()> {
        for allocator in heaps.iter() {
            self.register_allocator(allocator.clone())?;
        }
        Ok(())
    }

    fn ensure_not_lost(&self) -> Result<()> {
        if self.state == FrameState::Lost {
            return Err(Error::DeviceRemoved(
                "Rendering command unit lost its device".to_string()
            ));
        }
        Ok(())
    }

    fn wait_frame(&mut self, frame_index: u32) -> Result<()> {
        let frame = &self.frames[frame_index as usize];
        let blocked = frame.wait(self.fence.as_ref(), &self.fence_event, self.config.fence_wait_timeout)?;
        if blocked {
            self.stats.blocking_waits += 1;
            engine_trace!(SOURCE, "Waited for frame {} (fence value {})", frame_index, frame.fence_value());
        }
        Ok(())
    }

    fn reclaim_frame(&self, frame_index: u32) -> Result<()> {
        for allocator in &self.allocators {
            allocator.process_deferred_free(frame_index)?;
        }
        Ok(())
    }

    fn mark_lost(&mut self, operation: &str, err: Error) -> Error {
        self.state = FrameState::Lost;
        engine_error!(SOURCE, "Queue {} failed, device lost: {}", operation, err);
        match err {
            Error::DeviceRemoved(_) => err,
            other => Error::DeviceRemoved(format!("Queue {} failed: {}", operation, other)),
        }
    }

    /// Start recording the next frame
    ///
    /// Blocks only if the GPU has not yet finished the previous submission
    /// of this frame slot.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.ensure_not_lost()?;
        if self.state == FrameState::Recording {
            return Err(Error::InvalidOperation(
                "begin_frame called while a frame is recording".to_string()
            ));
        }

        let frame_index = self.cursor.frame_index();
        self.wait_frame(frame_index)?;
        self.reclaim_frame(frame_index)?;
        self.cursor.set_free_bin(frame_index);
        self.frames[frame_index as usize].reset()?;

        self.state = FrameState::Recording;
        engine_trace!(SOURCE, "Recording frame {}", frame_index);
        Ok(())
    }

    /// Command list of the frame being recorded
    pub fn command_list_mut(&mut self) -> Result<&mut dyn CommandList> {
        if self.state != FrameState::Recording {
            return Err(Error::InvalidOperation(
                "No frame is recording (call begin_frame first)".to_string()
            ));
        }
        let frame_index = self.cursor.frame_index() as usize;
        Ok(self.frames[frame_index].command_list_mut())
    }

    /// Submit the frame being recorded and move to the next frame slot
    pub fn end_frame(&mut self) -> Result<()> {
        self.ensure_not_lost()?;
        if self.state != FrameState::Recording {
            return Err(Error::InvalidOperation(
                "end_frame called without a matching begin_frame".to_string()
            ));
        }

        let frame_index = self.cursor.frame_index();
        let closed = self.frames[frame_index as usize].close();
        if let Err(err) = closed {
            return Err(self.mark_lost("close", err));
        }

        let submitted = self.queue.submit(self.frames[frame_index as usize].command_list());
        if let Err(err) = submitted {
            return Err(self.mark_lost("submission", err));
        }

        self.next_fence_value += 1;
        let fence_value = self.next_fence_value;
        self.frames[frame_index as usize].set_fence_value(fence_value);

        let signaled = self.queue.signal(self.fence.as_ref(), fence_value);
        if let Err(err) = signaled {
            return Err(self.mark_lost("signal", err));
        }

        self.cursor.advance();
        self.stats.frames_submitted += 1;
        self.state = FrameState::Submitted;
        engine_trace!(SOURCE, "Submitted frame {} with fence value {}", frame_index, fence_value);
        Ok(())
    }

    /// Wait for every frame in flight and reclaim every deferred free
    ///
    /// Leaves the unit `Idle` with all deferred-free bins empty.
    pub fn flush_frames(&mut self) -> Result<()> {
        self.ensure_not_lost()?;
        if self.state == FrameState::Recording {
            return Err(Error::InvalidOperation(
                "flush_frames called while a frame is recording".to_string()
            ));
        }

        self.wait_all_frames()?;
        let frame_count = self.cursor.frame_count();
        for frame_index in 0..frame_count {
            self.reclaim_frame(frame_index)?;
        }

        self.state = FrameState::Idle;
        engine_debug!(SOURCE, "Flushed {} frames (fence value {})", frame_count, self.next_fence_value);
        Ok(())
    }

    /// Wait for every frame, oldest submission first
    fn wait_all_frames(&mut self) -> Result<()> {
        let frame_count = self.cursor.frame_count();
        let oldest = self.cursor.frame_index();
        for offset in 0..frame_count {
            self.wait_frame((oldest + offset) % frame_count)?;
        }
        Ok(())
    }

    /// Drop path for a unit abandoned mid-recording
    ///
    /// The open list was never submitted, so waiting is safe. The recording
    /// frame's bin stays pending: the abandoned list may still name its slots.
    fn abandon_recording(&mut self) -> Result<()> {
        let recording = self.cursor.frame_index();
        self.wait_all_frames()?;
        for frame_index in (0..self.cursor.frame_count()).filter(|&f| f != recording) {
            self.reclaim_frame(frame_index)?;
        }
        Ok(())
    }

    // ===== DIAGNOSTICS =====

    /// Frame the next `begin_frame` records into
    pub fn frame_index(&self) -> u32 {
        self.cursor.frame_index()
    }

    pub fn frame_count(&self) -> u32 {
        self.cursor.frame_count()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Last fence value assigned to a submission
    pub fn next_fence_value(&self) -> u64 {
        self.next_fence_value
    }

    /// Highest fence value the GPU has reached
    pub fn completed_fence_value(&self) -> u64 {
        self.fence.completed_value()
    }

    /// Frame slot `index`, if it exists
    pub fn frame(&self, index: u32) -> Option<&CommandFrame> {
        self.frames.get(index as usize)
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl Drop for RenderingCommandUnit {
    fn drop(&mut self) {
        match self.state {
            FrameState::Lost => {}
            FrameState::Recording => {
                engine_warn!(SOURCE, "Dropped while recording frame {}, waiting for frames in flight",
                    self.cursor.frame_index());
                if let Err(e) = self.abandon_recording() {
                    engine_error!(SOURCE, "Failed to wait for frames on drop: {}", e);
                }
            }
            FrameState::Idle | FrameState::Submitted => {
                if let Err(e) = self.flush_frames() {
                    engine_error!(SOURCE, "Failed to flush frames on drop: {}", e);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "rendering_command_unit_tests.rs"]
mod tests;

/// Frame index shared by the rendering command unit and the descriptor allocators

use std::sync::atomic::{AtomicU32, Ordering};
use crate::config::MAX_FRAMES_IN_FLIGHT;
use crate::error::{Error, Result};

/// Round-robin position in the frames in flight
///
/// `frame_index` is the frame the next `begin_frame` records into.
/// `free_bin` is the frame whose deferred-free bin receives frees: the frame
/// most recently begun, so a free issued between `end_frame` and the next
/// `begin_frame` is held until that submitted frame retires.
#[derive(Debug)]
pub struct FrameCursor {
    frame_count: u32,
    frame_index: AtomicU32,
    free_bin: AtomicU32,
}

impl FrameCursor {
    /// Create a cursor over `frame_count` frames, starting at frame 0
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` if `frame_count` is outside `1..=MAX_FRAMES_IN_FLIGHT`.
    pub fn new(frame_count: u32) -> Result<Self> {
        if frame_count == 0 || frame_count > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::OutOfRange(format!(
                "frame_count {} outside 1..={}", frame_count, MAX_FRAMES_IN_FLIGHT
            )));
        }
        Ok(Self {
            frame_count,
            frame_index: AtomicU32::new(0),
            free_bin: AtomicU32::new(0),
        })
    }

    /// Number of frames in flight
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Frame the next `begin_frame` records into
    pub fn frame_index(&self) -> u32 {
        self.frame_index.load(Ordering::Acquire)
    }

    /// Frame whose bin currently receives frees
    pub fn free_bin(&self) -> u32 {
        self.free_bin.load(Ordering::Acquire)
    }

    pub(crate) fn set_free_bin(&self, frame: u32) {
        self.free_bin.store(frame % self.frame_count, Ordering::Release);
    }

    /// Move to the next frame, returning the new frame index
    pub(crate) fn advance(&self) -> u32 {
        let next = (self.frame_index() + 1) % self.frame_count;
        self.frame_index.store(next, Ordering::Release);
        next
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "frame_cursor_tests.rs"]
mod tests;

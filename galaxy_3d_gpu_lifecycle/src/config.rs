/// Configuration for the frame loop and the descriptor heaps

use std::time::Duration;
use crate::error::{Error, Result};
use crate::graphics_device::{CommandListType, DescriptorKind, DeviceLimits};

/// Upper bound on the number of frames in flight
pub const MAX_FRAMES_IN_FLIGHT: u32 = 16;

// ============================================================================
// FrameConfig
// ============================================================================

/// Rendering command unit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Number of frames in flight (1..=MAX_FRAMES_IN_FLIGHT)
    pub frame_count: u32,
    /// Type of the command lists and of the submission queue
    pub list_type: CommandListType,
    /// Maximum time to block on a fence (`None` waits forever)
    pub fence_wait_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_count: 3,
            list_type: CommandListType::Direct,
            fence_wait_timeout: None,
        }
    }
}

impl FrameConfig {
    /// Check the frame count
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` if `frame_count` is outside `1..=MAX_FRAMES_IN_FLIGHT`.
    pub fn validate(&self) -> Result<()> {
        if self.frame_count == 0 || self.frame_count > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::OutOfRange(format!(
                "frame_count {} outside 1..={}", self.frame_count, MAX_FRAMES_IN_FLIGHT
            )));
        }
        Ok(())
    }
}

// ============================================================================
// DescriptorHeapsConfig
// ============================================================================

/// Capacity and shader visibility of one descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Number of descriptor slots
    pub capacity: u32,
    /// Requested shader visibility (ignored for RTV/DSV heaps)
    pub shader_visible: bool,
}

/// Descriptor heap sizes for the four kinds of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapsConfig {
    pub render_target_views: HeapConfig,
    pub depth_stencil_views: HeapConfig,
    pub resource_views: HeapConfig,
    pub samplers: HeapConfig,
}

impl Default for DescriptorHeapsConfig {
    fn default() -> Self {
        Self {
            render_target_views: HeapConfig { capacity: 64, shader_visible: false },
            depth_stencil_views: HeapConfig { capacity: 16, shader_visible: false },
            resource_views: HeapConfig { capacity: 4096, shader_visible: true },
            samplers: HeapConfig { capacity: 64, shader_visible: true },
        }
    }
}

impl DescriptorHeapsConfig {
    /// Heap configuration of `kind`
    pub fn heap(&self, kind: DescriptorKind) -> HeapConfig {
        match kind {
            DescriptorKind::RenderTargetView => self.render_target_views,
            DescriptorKind::DepthStencilView => self.depth_stencil_views,
            DescriptorKind::ResourceView => self.resource_views,
            DescriptorKind::Sampler => self.samplers,
        }
    }

    /// Check every capacity against the device limits
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` naming the first heap whose capacity is zero or
    /// above the limit of its kind.
    pub fn validate(&self, limits: &DeviceLimits) -> Result<()> {
        for kind in DescriptorKind::ALL {
            validate_heap_capacity(kind, self.heap(kind).capacity, limits)?;
        }
        Ok(())
    }
}

/// Check one heap capacity against the device limits
pub(crate) fn validate_heap_capacity(kind: DescriptorKind, capacity: u32, limits: &DeviceLimits) -> Result<()> {
    if capacity == 0 {
        return Err(Error::OutOfRange(format!(
            "{} heap capacity must be greater than zero", kind.short_name()
        )));
    }
    if kind == DescriptorKind::Sampler && capacity > limits.max_sampler_heap_size {
        return Err(Error::OutOfRange(format!(
            "Sampler heap capacity {} exceeds the sampler heap limit {}",
            capacity, limits.max_sampler_heap_size
        )));
    }
    if capacity > limits.max_descriptor_heap_size {
        return Err(Error::OutOfRange(format!(
            "{} heap capacity {} exceeds the descriptor heap limit {}",
            kind.short_name(), capacity, limits.max_descriptor_heap_size
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

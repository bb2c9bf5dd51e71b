/// The four descriptor allocators of a device, and the builder that creates them

use std::sync::Arc;
use crate::config::{DescriptorHeapsConfig, HeapConfig};
use crate::descriptor::DescriptorHeapAllocator;
use crate::error::Result;
use crate::frame::FrameCursor;
use crate::graphics_device::{DescriptorKind, GraphicsDevice};
use crate::engine_info;

/// One initialized allocator per descriptor kind
pub struct DescriptorHeaps {
    render_target_views: Arc<DescriptorHeapAllocator>,
    depth_stencil_views: Arc<DescriptorHeapAllocator>,
    resource_views: Arc<DescriptorHeapAllocator>,
    samplers: Arc<DescriptorHeapAllocator>,
}

impl DescriptorHeaps {
    pub fn render_target_views(&self) -> &Arc<DescriptorHeapAllocator> {
        &self.render_target_views
    }

    pub fn depth_stencil_views(&self) -> &Arc<DescriptorHeapAllocator> {
        &self.depth_stencil_views
    }

    pub fn resource_views(&self) -> &Arc<DescriptorHeapAllocator> {
        &self.resource_views
    }

    pub fn samplers(&self) -> &Arc<DescriptorHeapAllocator> {
        &self.samplers
    }

    /// Allocator serving `kind`
    pub fn get(&self, kind: DescriptorKind) -> &Arc<DescriptorHeapAllocator> {
        match kind {
            DescriptorKind::RenderTargetView => &self.render_target_views,
            DescriptorKind::DepthStencilView => &self.depth_stencil_views,
            DescriptorKind::ResourceView => &self.resource_views,
            DescriptorKind::Sampler => &self.samplers,
        }
    }

    /// All four allocators, in `DescriptorKind::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DescriptorHeapAllocator>> {
        DescriptorKind::ALL.into_iter().map(move |kind| self.get(kind))
    }

    /// Slots waiting in the deferred-free bins of all four heaps
    pub fn total_pending_frees(&self) -> usize {
        self.iter().map(|allocator| allocator.total_pending_frees()).sum()
    }
}

/// Builds a `DescriptorHeaps` set
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::descriptor::DescriptorHeapsBuilder;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::frame::FrameCursor;
/// use galaxy_3d_gpu_lifecycle::galaxy3d::headless::{HeadlessDevice, CompletionMode};
///
/// let device = Arc::new(HeadlessDevice::new(CompletionMode::Immediate));
/// let cursor = Arc::new(FrameCursor::new(2).unwrap());
///
/// let heaps = DescriptorHeapsBuilder::new(device, cursor)
///     .render_target_views(8)
///     .depth_stencil_views(2)
///     .resource_views(256, true)
///     .samplers(16, true)
///     .build()
///     .unwrap();
///
/// assert_eq!(heaps.resource_views().capacity(), 256);
/// assert!(!heaps.render_target_views().shader_visible());
/// ```
pub struct DescriptorHeapsBuilder {
    device: Arc<dyn GraphicsDevice>,
    cursor: Arc<FrameCursor>,
    config: DescriptorHeapsConfig,
}

impl DescriptorHeapsBuilder {
    /// Start from `DescriptorHeapsConfig::default()`
    pub fn new(device: Arc<dyn GraphicsDevice>, cursor: Arc<FrameCursor>) -> Self {
        Self { device, cursor, config: DescriptorHeapsConfig::default() }
    }

    /// Replace every heap setting at once
    pub fn with_config(mut self, config: DescriptorHeapsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn render_target_views(mut self, capacity: u32) -> Self {
        self.config.render_target_views = HeapConfig { capacity, shader_visible: false };
        self
    }

    pub fn depth_stencil_views(mut self, capacity: u32) -> Self {
        self.config.depth_stencil_views = HeapConfig { capacity, shader_visible: false };
        self
    }

    pub fn resource_views(mut self, capacity: u32, shader_visible: bool) -> Self {
        self.config.resource_views = HeapConfig { capacity, shader_visible };
        self
    }

    pub fn samplers(mut self, capacity: u32, shader_visible: bool) -> Self {
        self.config.samplers = HeapConfig { capacity, shader_visible };
        self
    }

    /// Validate the capacities, then create and initialize the four allocators
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` for an invalid capacity (nothing is created), or
    /// the first heap creation error.
    pub fn build(self) -> Result<DescriptorHeaps> {
        self.config.validate(&self.device.limits())?;

        let create = |kind: DescriptorKind| -> Result<Arc<DescriptorHeapAllocator>> {
            let heap = self.config.heap(kind);
            let allocator = DescriptorHeapAllocator::new(kind, self.device.clone(), self.cursor.clone());
            allocator.initialize(heap.capacity, heap.shader_visible)?;
            Ok(Arc::new(allocator))
        };

        let heaps = DescriptorHeaps {
            render_target_views: create(DescriptorKind::RenderTargetView)?,
            depth_stencil_views: create(DescriptorKind::DepthStencilView)?,
            resource_views: create(DescriptorKind::ResourceView)?,
            samplers: create(DescriptorKind::Sampler)?,
        };

        engine_info!("galaxy3d::DescriptorHeaps",
            "Descriptor heaps ready: {} RTV, {} DSV, {} CBV/SRV/UAV, {} samplers",
            self.config.render_target_views.capacity,
            self.config.depth_stencil_views.capacity,
            self.config.resource_views.capacity,
            self.config.samplers.capacity);

        Ok(heaps)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "descriptor_heaps_tests.rs"]
mod tests;

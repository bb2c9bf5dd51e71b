/// Descriptor kinds, descriptor addresses and the device-side heap trait

use std::fmt;
use bitflags::bitflags;
use crate::graphics_device::DeviceLimits;

/// Kind of resource view stored in a descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorKind {
    /// Render target views (color attachments)
    RenderTargetView,
    /// Depth-stencil views
    DepthStencilView,
    /// Shader-resource, constant-buffer and unordered-access views
    ResourceView,
    /// Samplers
    Sampler,
}

impl DescriptorKind {
    /// All kinds, in heap-creation order
    pub const ALL: [DescriptorKind; 4] = [
        DescriptorKind::RenderTargetView,
        DescriptorKind::DepthStencilView,
        DescriptorKind::ResourceView,
        DescriptorKind::Sampler,
    ];

    /// Whether heaps of this kind may be bound to shader stages
    ///
    /// Render-target and depth-stencil heaps are only ever written by the
    /// output-merger, so the hardware never exposes them to shaders.
    pub fn allows_shader_visibility(self) -> bool {
        matches!(self, DescriptorKind::ResourceView | DescriptorKind::Sampler)
    }

    /// Largest heap the device accepts for this kind
    pub fn max_heap_capacity(self, limits: &DeviceLimits) -> u32 {
        match self {
            DescriptorKind::Sampler => limits.max_sampler_heap_size.min(limits.max_descriptor_heap_size),
            _ => limits.max_descriptor_heap_size,
        }
    }

    /// Short name used in log messages
    pub fn short_name(self) -> &'static str {
        match self {
            DescriptorKind::RenderTargetView => "RTV",
            DescriptorKind::DepthStencilView => "DSV",
            DescriptorKind::ResourceView => "CBV/SRV/UAV",
            DescriptorKind::Sampler => "Sampler",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Creation flags for a device descriptor heap
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DescriptorHeapFlags: u32 {
        /// Heap is addressable from shaders (has a GPU start address)
        const SHADER_VISIBLE = 1 << 0;
    }
}

/// CPU-side address of a descriptor slot
///
/// Zero is the null address and never designates a valid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CpuDescriptorAddress(pub u64);

impl CpuDescriptorAddress {
    /// The null address
    pub const NULL: CpuDescriptorAddress = CpuDescriptorAddress(0);

    /// Whether this is the null address
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address of slot `index` in a heap starting at `self`
    pub fn offset(self, index: u32, stride: u32) -> CpuDescriptorAddress {
        CpuDescriptorAddress(self.0 + u64::from(index) * u64::from(stride))
    }
}

/// Shader-visible (GPU) address of a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuDescriptorAddress(pub u64);

impl GpuDescriptorAddress {
    /// Address of slot `index` in a heap starting at `self`
    pub fn offset(self, index: u32, stride: u32) -> GpuDescriptorAddress {
        GpuDescriptorAddress(self.0 + u64::from(index) * u64::from(stride))
    }
}

/// Device-side descriptor heap
///
/// Created by `GraphicsDevice::create_descriptor_heap`. Releasing the heap
/// (dropping the box) returns its memory to the device; the caller must make
/// sure no in-flight GPU work still references it.
pub trait DeviceDescriptorHeap: Send + Sync {
    /// Kind of descriptors stored in this heap
    fn kind(&self) -> DescriptorKind;

    /// Number of descriptor slots
    fn capacity(&self) -> u32;

    /// Creation flags
    fn flags(&self) -> DescriptorHeapFlags;

    /// CPU address of slot 0
    fn cpu_start(&self) -> CpuDescriptorAddress;

    /// GPU address of slot 0 (shader-visible heaps only)
    fn gpu_start(&self) -> Option<GpuDescriptorAddress>;
}

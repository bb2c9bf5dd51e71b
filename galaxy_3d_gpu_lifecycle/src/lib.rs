/*!
# Galaxy 3D GPU Lifecycle

GPU-resource lifecycle core of the Galaxy 3D engine: descriptor heap
allocation with fence-deferred reclamation, and the frames-in-flight unit
that drives command recording, submission and fence synchronization.

## Architecture

- **GraphicsDevice**: Factory trait for heaps, command objects, queues and fences
- **DescriptorHeapAllocator**: Per-kind slot table + deferred-free ring
- **DescriptorHeaps**: The four allocators of a device, built together
- **RenderingCommandUnit**: Round-robin command frames, one queue, one fence
- **HeadlessDevice**: CPU-only device with a steppable GPU timeline

Backends implement the `graphics_device` traits; the core only ever sees the
device through them and observes the GPU through fence values.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod descriptor;
pub mod frame;
pub mod headless;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Configuration sub-module
    pub mod config {
        pub use crate::config::*;
    }

    // Device sub-module with the traits backends implement
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Descriptor allocation sub-module
    pub mod descriptor {
        pub use crate::descriptor::*;
    }

    // Frames in flight sub-module
    pub mod frame {
        pub use crate::frame::*;
    }

    // Headless backend sub-module
    pub mod headless {
        pub use crate::headless::*;
    }
}

/// Headless backend - a CPU-only GraphicsDevice
///
/// Used by the test suites and by tools that drive the frame loop without a
/// GPU. Fence completion is either immediate or stepped by hand.

// Module declarations
pub mod headless_device;
pub mod headless_command;
pub mod headless_fence;
pub mod headless_heap;

// Re-export everything from headless_device.rs
pub use headless_device::*;

// Re-export from other modules
pub use headless_command::*;
pub use headless_fence::HeadlessFence;
pub use headless_heap::HeadlessDescriptorHeap;

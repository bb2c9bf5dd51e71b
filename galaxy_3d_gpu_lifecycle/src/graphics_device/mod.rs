/// Graphics device module - the device-side interfaces consumed by the core

// Module declarations
pub mod graphics_device;
pub mod descriptor;
pub mod command_list;
pub mod fence;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use descriptor::*;
pub use command_list::*;
pub use fence::*;

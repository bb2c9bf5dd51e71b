/// Frame module - frames in flight and their fence synchronization

// Module declarations
pub mod frame_cursor;
pub mod command_frame;
pub mod rendering_command_unit;

// Re-export everything from rendering_command_unit.rs
pub use rendering_command_unit::*;

// Re-export from other modules
pub use frame_cursor::*;
pub use command_frame::*;

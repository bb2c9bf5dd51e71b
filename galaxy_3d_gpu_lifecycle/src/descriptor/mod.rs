/// Descriptor module - descriptor slots with fence-deferred reclamation

// Module declarations
pub mod descriptor_handle;
pub mod deferred_free_ring;
pub mod descriptor_heap_allocator;
pub mod owned_descriptor;
pub mod descriptor_heaps;
pub(crate) mod slot_table;

// Re-export everything from descriptor_heap_allocator.rs
pub use descriptor_heap_allocator::*;

// Re-export from other modules
pub use descriptor_handle::*;
pub use deferred_free_ring::*;
pub use owned_descriptor::*;
pub use descriptor_heaps::*;

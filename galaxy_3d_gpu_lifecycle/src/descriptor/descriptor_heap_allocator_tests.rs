/// Unit tests for DescriptorHeapAllocator

use super::*;
use crate::graphics_device::DeviceLimits;
use crate::headless::{CompletionMode, HeadlessDevice, HeadlessDeviceDesc};

fn setup(kind: DescriptorKind, frame_count: u32) -> (HeadlessDevice, Arc<FrameCursor>, Arc<DescriptorHeapAllocator>) {
    let device = HeadlessDevice::new(CompletionMode::Immediate);
    let cursor = Arc::new(FrameCursor::new(frame_count).unwrap());
    let allocator = Arc::new(DescriptorHeapAllocator::new(kind, Arc::new(device.clone()), cursor.clone()));
    (device, cursor, allocator)
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_uninitialized_allocator_reports_empty_diagnostics() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);

    assert!(!allocator.is_initialized());
    assert_eq!(allocator.capacity(), 0);
    assert_eq!(allocator.size(), 0);
    assert!(!allocator.shader_visible());
    assert_eq!(allocator.kind(), DescriptorKind::ResourceView);
}

#[test]
fn test_initialize_creates_heap() {
    let (device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);

    allocator.initialize(32, true).unwrap();

    assert!(allocator.is_initialized());
    assert_eq!(allocator.capacity(), 32);
    assert!(allocator.shader_visible());
    assert_eq!(device.live_heap_count(), 1);
}

#[test]
fn test_initialize_forces_render_targets_non_visible() {
    for kind in [DescriptorKind::RenderTargetView, DescriptorKind::DepthStencilView] {
        let (_device, _cursor, allocator) = setup(kind, 2);
        allocator.initialize(4, true).unwrap();
        assert!(!allocator.shader_visible());
        assert!(allocator.allocate().unwrap().gpu_address().is_none());
    }
}

#[test]
fn test_initialize_rejects_bad_capacities() {
    let device = HeadlessDevice::with_desc(HeadlessDeviceDesc {
        limits: DeviceLimits { max_descriptor_heap_size: 64, max_sampler_heap_size: 8 },
        ..HeadlessDeviceDesc::default()
    });
    let cursor = Arc::new(FrameCursor::new(2).unwrap());
    let srv = DescriptorHeapAllocator::new(DescriptorKind::ResourceView, Arc::new(device.clone()), cursor.clone());
    let samplers = DescriptorHeapAllocator::new(DescriptorKind::Sampler, Arc::new(device.clone()), cursor);

    assert!(matches!(srv.initialize(0, true), Err(Error::OutOfRange(_))));
    assert!(matches!(srv.initialize(65, true), Err(Error::OutOfRange(_))));
    assert!(matches!(samplers.initialize(9, true), Err(Error::OutOfRange(_))));
    assert!(srv.initialize(64, true).is_ok());
    assert!(samplers.initialize(8, true).is_ok());
    assert_eq!(device.live_heap_count(), 2);
}

#[test]
fn test_reinitialize_with_pending_frees_is_rejected() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(4, false).unwrap();
    let handle = allocator.allocate().unwrap();
    allocator.free(handle).unwrap();

    let result = allocator.initialize(8, false);

    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    assert_eq!(allocator.capacity(), 4);
}

#[test]
fn test_reinitialize_makes_old_handles_foreign() {
    let (device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(4, false).unwrap();
    let old = allocator.allocate().unwrap();

    allocator.initialize(8, false).unwrap();

    assert_eq!(allocator.capacity(), 8);
    assert_eq!(allocator.size(), 0);
    assert_eq!(device.live_heap_count(), 1);
    assert!(matches!(allocator.free(old), Err(Error::InvalidOperation(_))));
}

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_allocate_before_initialize_fails() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::Sampler, 3);
    assert_eq!(
        allocator.allocate().unwrap_err(),
        Error::DescriptorHeapDoesNotExist(DescriptorKind::Sampler)
    );
}

#[test]
fn test_allocate_succeeds_exactly_capacity_times() {
    for capacity in [1, 2, 7, 16] {
        let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
        allocator.initialize(capacity, true).unwrap();

        let handles: Vec<_> = (0..capacity).map(|_| allocator.allocate().unwrap()).collect();

        assert_eq!(handles.len() as u32, capacity);
        assert_eq!(allocator.size(), capacity);
        assert_eq!(
            allocator.allocate().unwrap_err(),
            Error::CapacityExceeded { kind: DescriptorKind::ResourceView, capacity }
        );
    }
}

// ============================================================================
// Deferred free
// ============================================================================

#[test]
fn test_free_defers_until_frame_is_processed() {
    let (_device, cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(2, false).unwrap();
    let a = allocator.allocate().unwrap();
    let _b = allocator.allocate().unwrap();

    allocator.free(a).unwrap();

    assert_eq!(allocator.size(), 2);
    assert_eq!(allocator.pending_free_count(cursor.free_bin()), 1);
    assert!(matches!(allocator.allocate(), Err(Error::CapacityExceeded { .. })));

    allocator.process_deferred_free(cursor.free_bin()).unwrap();

    assert_eq!(allocator.size(), 1);
    assert_eq!(allocator.total_pending_frees(), 0);
    assert_eq!(allocator.allocate().unwrap().index(), 0);
}

#[test]
fn test_free_goes_to_current_free_bin() {
    let (_device, cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(4, false).unwrap();
    let a = allocator.allocate().unwrap();
    let b = allocator.allocate().unwrap();

    allocator.free(a).unwrap();
    cursor.set_free_bin(2);
    allocator.free(b).unwrap();

    assert_eq!(allocator.pending_free_count(0), 1);
    assert_eq!(allocator.pending_free_count(1), 0);
    assert_eq!(allocator.pending_free_count(2), 1);

    allocator.process_deferred_free(1).unwrap();
    assert_eq!(allocator.size(), 2);
    allocator.process_deferred_free(2).unwrap();
    assert_eq!(allocator.size(), 1);
}

#[test]
fn test_reclaim_follows_stack_write_rule() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(4, false).unwrap();
    let handles: Vec<_> = (0..4).map(|_| allocator.allocate().unwrap()).collect();
    let mut handles = handles.into_iter();
    let h0 = handles.next().unwrap();
    let _h1 = handles.next().unwrap();
    let _h2 = handles.next().unwrap();
    let h3 = handles.next().unwrap();

    // size 4 -> 3 writes slot 0 at free_indices[3], 3 -> 2 writes slot 3 at free_indices[2]
    allocator.free(h0).unwrap();
    allocator.free(h3).unwrap();
    allocator.process_deferred_free(0).unwrap();

    assert_eq!(allocator.allocate().unwrap().index(), 3);
    assert_eq!(allocator.allocate().unwrap().index(), 0);
}

#[test]
fn test_free_rejects_handle_from_other_allocator() {
    let (_device, _cursor, a) = setup(DescriptorKind::ResourceView, 3);
    let (_device2, _cursor2, b) = setup(DescriptorKind::ResourceView, 3);
    a.initialize(4, false).unwrap();
    b.initialize(4, false).unwrap();
    let handle = a.allocate().unwrap();
    b.allocate().unwrap();

    assert!(matches!(b.free(handle), Err(Error::InvalidOperation(_))));
    assert_eq!(b.total_pending_frees(), 0);
}

#[test]
fn test_free_into_uninitialized_allocator_is_rejected() {
    let (_device, cursor, a) = setup(DescriptorKind::ResourceView, 3);
    let b = DescriptorHeapAllocator::new(DescriptorKind::ResourceView, Arc::new(HeadlessDevice::new(CompletionMode::Immediate)), cursor);
    a.initialize(4, false).unwrap();

    let handle = a.allocate().unwrap();

    assert!(matches!(b.free(handle), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_process_deferred_free_rejects_unknown_frame() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 2);
    allocator.initialize(4, false).unwrap();
    assert!(matches!(allocator.process_deferred_free(2), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_free_from_many_threads_is_serialized() {
    let (_device, cursor, allocator) = setup(DescriptorKind::ResourceView, 2);
    allocator.initialize(64, true).unwrap();

    let workers: Vec<_> = (0..4).map(|_| {
        let allocator = allocator.clone();
        std::thread::spawn(move || {
            for _ in 0..16 {
                let handle = allocator.allocate().unwrap();
                allocator.free(handle).unwrap();
            }
        })
    }).collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(allocator.size(), 64);
    assert_eq!(allocator.pending_free_count(cursor.free_bin()), 64);
    allocator.process_deferred_free(cursor.free_bin()).unwrap();
    assert_eq!(allocator.size(), 0);
}

// ============================================================================
// OwnedDescriptor
// ============================================================================

#[test]
fn test_owned_descriptor_frees_on_drop() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::Sampler, 3);
    allocator.initialize(4, true).unwrap();

    {
        let owned = allocator.allocate_owned().unwrap();
        assert_eq!(owned.index(), 0);
        assert_eq!(owned.kind(), DescriptorKind::Sampler);
        assert!(owned.gpu_address().is_some());
    }

    assert_eq!(allocator.size(), 1);
    assert_eq!(allocator.total_pending_frees(), 1);
}

#[test]
fn test_owned_descriptor_dispose_frees_once() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::Sampler, 3);
    allocator.initialize(4, true).unwrap();

    let owned = allocator.allocate_owned().unwrap();
    owned.dispose().unwrap();

    assert_eq!(allocator.total_pending_frees(), 1);
}

#[test]
fn test_owned_descriptor_dispose_reports_foreign_table() {
    let (_device, _cursor, allocator) = setup(DescriptorKind::ResourceView, 3);
    allocator.initialize(4, false).unwrap();
    let owned = allocator.allocate_owned().unwrap();

    allocator.initialize(4, false).unwrap();

    assert!(matches!(owned.dispose(), Err(Error::InvalidOperation(_))));
    assert_eq!(allocator.total_pending_frees(), 0);
}

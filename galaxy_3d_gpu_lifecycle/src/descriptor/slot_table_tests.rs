/// Unit tests for DescriptorSlotTable

use super::*;
use crate::graphics_device::{DescriptorHeapFlags, GraphicsDevice};
use crate::headless::{CompletionMode, HeadlessDevice};

fn create_table(kind: DescriptorKind, capacity: u32, flags: DescriptorHeapFlags) -> DescriptorSlotTable {
    let device = HeadlessDevice::new(CompletionMode::Immediate);
    let heap = device.create_descriptor_heap(kind, capacity, flags).unwrap();
    DescriptorSlotTable::new(heap, device.descriptor_increment_size(kind))
}

// ============================================================================
// Claim tests
// ============================================================================

#[test]
fn test_claim_hands_out_ascending_indices() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());

    let indices: Vec<u32> = (0..4).map(|_| table.claim().unwrap().index()).collect();

    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(table.size(), 4);
    assert!(table.claim().is_none());
}

#[test]
fn test_claim_computes_addresses_from_stride() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::SHADER_VISIBLE);
    let stride = table.stride();

    let first = table.claim().unwrap();
    let second = table.claim().unwrap();

    assert_eq!(second.cpu_address().0 - first.cpu_address().0, u64::from(stride));
    let (gpu0, gpu1) = (first.gpu_address().unwrap(), second.gpu_address().unwrap());
    assert_eq!(gpu1.0 - gpu0.0, u64::from(stride));
    assert!(table.shader_visible());
}

#[test]
fn test_non_visible_table_hands_out_cpu_only_handles() {
    let mut table = create_table(DescriptorKind::RenderTargetView, 2, DescriptorHeapFlags::empty());
    let handle = table.claim().unwrap();
    assert!(handle.gpu_address().is_none());
    assert_eq!(handle.kind(), DescriptorKind::RenderTargetView);
    assert_eq!(handle.capacity(), 2);
}

// ============================================================================
// Release validation tests
// ============================================================================

#[test]
fn test_release_returns_index_without_changing_size() {
    let mut table = create_table(DescriptorKind::Sampler, 4, DescriptorHeapFlags::empty());
    let _a = table.claim().unwrap();
    let b = table.claim().unwrap();

    assert_eq!(table.release(&b).unwrap(), 1);
    assert_eq!(table.size(), 2);
}

#[test]
fn test_release_twice_is_rejected() {
    let mut table = create_table(DescriptorKind::Sampler, 4, DescriptorHeapFlags::empty());
    let handle = table.claim().unwrap();
    let duplicate = handle_copy(&handle);

    table.release(&handle).unwrap();

    assert!(matches!(table.release(&duplicate), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_release_rejects_foreign_table() {
    let mut table_a = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    let mut table_b = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    let handle = table_a.claim().unwrap();
    table_b.claim().unwrap();

    assert!(matches!(table_b.release(&handle), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_release_rejects_empty_handle() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    let mut handle = table.claim().unwrap();
    let _taken = handle.take();

    assert!(handle.is_released());
    assert!(matches!(table.release(&handle), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_release_rejects_corrupted_addresses() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    let handle = table.claim().unwrap();
    let base = handle.cpu_address();
    let stride = table.stride();

    let null = DescriptorHandle { cpu: CpuDescriptorAddress::NULL, ..handle_copy(&handle) };
    let before_base = DescriptorHandle { cpu: CpuDescriptorAddress(base.0 - 1), ..handle_copy(&handle) };
    let misaligned = DescriptorHandle { cpu: CpuDescriptorAddress(base.0 + 1), ..handle_copy(&handle) };
    let past_end = DescriptorHandle { cpu: base.offset(4, stride), ..handle_copy(&handle) };

    for bad in [null, before_base, misaligned, past_end] {
        assert!(matches!(table.release(&bad), Err(Error::InvalidOperation(_))));
    }
    assert_eq!(table.release(&handle).unwrap(), 0);
}

// ============================================================================
// Reclaim tests
// ============================================================================

#[test]
fn test_reclaim_writes_index_at_new_size() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    let handles: Vec<_> = (0..4).map(|_| table.claim().unwrap()).collect();

    let index = table.release(&handles[2]).unwrap();
    table.reclaim(index).unwrap();

    assert_eq!(table.size(), 3);
    assert_eq!(table.claim().unwrap().index(), 2);
}

#[test]
fn test_reclaim_on_empty_table_is_rejected() {
    let mut table = create_table(DescriptorKind::ResourceView, 4, DescriptorHeapFlags::empty());
    assert!(matches!(table.reclaim(0), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_each_table_gets_a_new_identity() {
    let a = create_table(DescriptorKind::ResourceView, 1, DescriptorHeapFlags::empty());
    let b = create_table(DescriptorKind::ResourceView, 1, DescriptorHeapFlags::empty());
    assert_ne!(a.table_id(), b.table_id());
}

fn handle_copy(handle: &DescriptorHandle) -> DescriptorHandle {
    DescriptorHandle {
        table_id: handle.table_id,
        kind: handle.kind,
        capacity: handle.capacity,
        index: handle.index,
        cpu: handle.cpu,
        gpu: handle.gpu,
    }
}

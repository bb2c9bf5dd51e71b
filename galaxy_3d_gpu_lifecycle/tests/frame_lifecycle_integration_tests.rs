//! Integration tests for descriptor reclamation across frames in flight
//!
//! Drives the rendering command unit against the headless device.
//! No GPU required.
//!
//! Run with: cargo test --test frame_lifecycle_integration_tests


use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use galaxy_3d_gpu_lifecycle::galaxy3d::{Error, ErrorCategory};
use galaxy_3d_gpu_lifecycle::galaxy3d::config::FrameConfig;
use galaxy_3d_gpu_lifecycle::galaxy3d::descriptor::DescriptorHeapsBuilder;
use galaxy_3d_gpu_lifecycle::galaxy3d::frame::{FrameState, RenderingCommandUnit};
use galaxy_3d_gpu_lifecycle::galaxy3d::headless::CompletionMode;
use headless_test_utils::{create_rig, run_frame};

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================

#[test]
fn test_integration_freed_slot_returns_after_frame_cycle() {
    let mut rig = create_rig(CompletionMode::Immediate, 3, 4);

    let mut handles: Vec<_> = (0..4).map(|_| rig.allocator.allocate().unwrap()).collect();
    let err = rig.allocator.allocate().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ResourceExhausted);

    let second = handles.remove(2);
    assert_eq!(second.index(), 2);
    rig.allocator.free(second).unwrap();
    assert_eq!(rig.allocator.size(), 4);

    for _ in 0..3 {
        run_frame(&mut rig.unit);
    }

    assert_eq!(rig.allocator.size(), 3);
    assert_eq!(rig.allocator.allocate().unwrap().index(), 2);
}

#[test]
fn test_integration_flush_leaves_every_bin_empty() {
    let frame_count = 3;
    let mut rig = create_rig(CompletionMode::Manual, frame_count, 16);

    for _ in 0..=frame_count {
        rig.unit.begin_frame().unwrap();
        let handle = rig.allocator.allocate().unwrap();
        rig.allocator.free(handle).unwrap();
        rig.unit.end_frame().unwrap();
        rig.device.retire_all();
    }
    assert!(rig.allocator.total_pending_frees() > 0);

    rig.unit.flush_frames().unwrap();

    for frame in 0..frame_count {
        assert_eq!(rig.allocator.pending_free_count(frame), 0);
    }
    assert_eq!(rig.allocator.size(), 0);
    assert_eq!(rig.unit.state(), FrameState::Idle);
}

#[test]
fn test_integration_freed_index_not_reused_within_frames_in_flight() {
    let frame_count = 3;
    let mut rig = create_rig(CompletionMode::Immediate, frame_count, 8);
    let mut held: Vec<_> = (0..8).map(|_| rig.allocator.allocate().unwrap()).collect();

    rig.unit.begin_frame().unwrap();
    let victim = held.remove(5);
    rig.allocator.free(victim).unwrap();
    rig.unit.end_frame().unwrap();

    // The next frame_count - 1 frames never see index 5 come back
    for _ in 0..frame_count - 1 {
        rig.unit.begin_frame().unwrap();
        assert!(rig.allocator.allocate().is_err());
        rig.unit.end_frame().unwrap();
    }

    rig.unit.begin_frame().unwrap();
    assert_eq!(rig.allocator.allocate().unwrap().index(), 5);
    rig.unit.end_frame().unwrap();
}

#[test]
fn test_integration_indices_are_reused_not_leaked() {
    let mut rig = create_rig(CompletionMode::Immediate, 2, 4);

    for _ in 0..50 {
        rig.unit.begin_frame().unwrap();
        let handle = rig.allocator.allocate().unwrap();
        assert!(handle.index() < 4);
        rig.allocator.free(handle).unwrap();
        rig.unit.end_frame().unwrap();
    }

    assert!(rig.allocator.size() <= 2);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_integration_allocation_from_worker_threads_gives_unique_indices() {
    let rig = create_rig(CompletionMode::Immediate, 3, 256);

    let workers: Vec<_> = (0..8).map(|_| {
        let allocator = rig.allocator.clone();
        thread::spawn(move || {
            (0..32).map(|_| allocator.allocate().unwrap().index()).collect::<Vec<u32>>()
        })
    }).collect();

    let mut seen = HashSet::new();
    for worker in workers {
        for index in worker.join().unwrap() {
            assert!(seen.insert(index), "index {} handed out twice", index);
        }
    }
    assert_eq!(seen.len(), 256);
    assert_eq!(rig.allocator.size(), 256);
}

#[test]
fn test_integration_frame_loop_with_simulated_gpu_thread() {
    let mut rig = create_rig(CompletionMode::Manual, 2, 8);

    let gpu = {
        let device = rig.device.clone();
        thread::spawn(move || {
            let mut retired = 0;
            while retired < 10 {
                if device.retire_next().is_some() {
                    retired += 1;
                } else {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        })
    };

    for _ in 0..10 {
        rig.unit.begin_frame().unwrap();
        let owned = rig.allocator.allocate_owned().unwrap();
        let base = owned.gpu_address().unwrap();
        let list = rig.unit.command_list_mut().unwrap();
        list.bind_descriptor_table(0, base).unwrap();
        list.draw_instanced(3, 1).unwrap();
        drop(owned);
        rig.unit.end_frame().unwrap();
    }

    gpu.join().unwrap();
    rig.unit.flush_frames().unwrap();

    assert_eq!(rig.unit.stats().frames_submitted, 10);
    assert_eq!(rig.unit.completed_fence_value(), 10);
    assert_eq!(rig.device.take_submitted_batches().len(), 10);
    assert_eq!(rig.allocator.total_pending_frees(), 0);
    assert_eq!(rig.allocator.size(), 0);
}

#[test]
fn test_integration_long_frame_loop_keeps_history_bounded() {
    let mut rig = create_rig(CompletionMode::Immediate, 3, 16);

    for frame in 0..3000u32 {
        run_frame(&mut rig.unit);
        if frame % 100 == 99 {
            assert_eq!(rig.device.take_submitted_batches().len(), 100);
        }
    }

    assert!(rig.device.submitted_batches().is_empty());
    assert_eq!(rig.device.submission_count(), 3000);
    assert_eq!(rig.unit.completed_fence_value(), 3000);
}

// ============================================================================
// DESCRIPTOR HEAPS + FRAME UNIT
// ============================================================================

#[test]
fn test_integration_heaps_built_on_unit_cursor() {
    let device = Arc::new(galaxy_3d_gpu_lifecycle::galaxy3d::headless::HeadlessDevice::new(
        CompletionMode::Immediate,
    ));
    let mut unit = RenderingCommandUnit::new(device.as_ref(), FrameConfig::default()).unwrap();
    let heaps = DescriptorHeapsBuilder::new(device.clone(), unit.frame_cursor().clone())
        .resource_views(16, true)
        .samplers(4, true)
        .build()
        .unwrap();
    unit.register_heaps(&heaps).unwrap();

    unit.begin_frame().unwrap();
    heaps.samplers().allocate_owned().unwrap().dispose().unwrap();
    let rtv = heaps.render_target_views().allocate().unwrap();
    heaps.render_target_views().free(rtv).unwrap();
    unit.end_frame().unwrap();
    assert_eq!(heaps.total_pending_frees(), 2);

    unit.flush_frames().unwrap();

    assert_eq!(heaps.total_pending_frees(), 0);
    assert_eq!(device.live_heap_count(), 4);
}

// ============================================================================
// DEVICE LOSS
// ============================================================================

#[test]
fn test_integration_device_removal_is_fatal_for_the_unit() {
    let mut rig = create_rig(CompletionMode::Immediate, 2, 4);
    run_frame(&mut rig.unit);

    rig.unit.begin_frame().unwrap();
    rig.device.remove_device("TDR");
    let err = rig.unit.end_frame().unwrap_err();

    assert!(matches!(err, Error::DeviceRemoved(_)));
    assert!(err.is_fatal());
    assert_eq!(rig.unit.state(), FrameState::Lost);
    assert!(matches!(rig.unit.begin_frame(), Err(Error::DeviceRemoved(_))));
}

#[test]
fn test_integration_foreign_free_is_an_invariant_violation() {
    let rig_a = create_rig(CompletionMode::Immediate, 2, 4);
    let rig_b = create_rig(CompletionMode::Immediate, 2, 4);
    let handle = rig_a.allocator.allocate().unwrap();

    let err = rig_b.allocator.free(handle).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::InvariantViolation);
    assert!(err.is_fatal());
}

//! Unit tests for rendering_context.rs
//!
//! Drives the frame state machine against the mock device and checks the
//! ordering guarantees through the device event log.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::config::Config;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockDevice, MockEvent, MockWindow};
use crate::graphics_device::{
    AcquireResult, AttachmentFlags, CommandRecorder, Extent2D, PresentStatus, TextureFormat, Window,
};
use crate::rendering_context::{FrameState, RenderingContext};

fn setup(image_count: usize, slot_count: Option<usize>) -> (MockDevice, Arc<MockWindow>, RenderingContext<MockDevice>) {
    let device = MockDevice::new();
    device.set_image_count(image_count);
    device.set_slot_count(slot_count);
    let window = MockWindow::new(800, 600);
    let dyn_window: Arc<dyn Window> = window.clone();
    let context = RenderingContext::new(
        Arc::new(device.clone()),
        dyn_window,
        AttachmentFlags::COLOR,
        Config::default(),
    )
    .unwrap();
    (device, window, context)
}

fn run_frame(context: &mut RenderingContext<MockDevice>) -> u32 {
    let image_index = context.begin_frame().unwrap().image_index;
    context.submit_frame().unwrap();
    image_index
}

/// Every acquire must use a semaphore that is free: its previous acquisition
/// was submitted, or a new swapchain generation was built in between
fn assert_no_semaphore_reacquired(events: &[MockEvent]) {
    let mut in_use: Vec<u32> = Vec::new();
    for event in events {
        match event {
            MockEvent::CreateSwapchain { .. } => in_use.clear(),
            MockEvent::Acquire { semaphore, .. } => {
                assert!(
                    !in_use.contains(semaphore),
                    "semaphore {} acquired again before its frame was submitted: {:?}",
                    semaphore,
                    events
                );
                in_use.push(*semaphore);
            }
            MockEvent::Submit { wait, .. } => in_use.retain(|s| s != wait),
            _ => {}
        }
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

#[test]
fn test_new_builds_one_frame_per_image() {
    let (_device, _window, context) = setup(3, None);

    assert_eq!(context.state(), FrameState::Idle);
    assert_eq!(context.image_count(), 3);
    assert_eq!(context.frame_count(), 3);
    assert_eq!(context.semaphore_slot_count(), 3);
    assert_eq!(context.extent(), Extent2D::new(800, 600));
    assert_eq!(context.format(), Some(TextureFormat::B8G8R8A8_UNORM));
    assert_eq!(context.generation(), 1);
    assert_eq!(context.frame_index(), 0);
    assert_eq!(context.semaphore_index(), 0);
    assert!(context.slot_fences().iter().all(|s| s.is_none()));
}

#[test]
fn test_depth_attachment_follows_flags_and_device() {
    let device = MockDevice::new();
    let window: Arc<dyn Window> = MockWindow::new(800, 600);
    let with_depth = RenderingContext::new(
        Arc::new(device.clone()),
        window.clone(),
        AttachmentFlags::COLOR | AttachmentFlags::DEPTH,
        Config::default(),
    )
    .unwrap();
    assert!(with_depth.frames().iter().all(|f| f.render_target().has_depth));

    device.set_depth_format(None);
    let without_depth = RenderingContext::new(
        Arc::new(device.clone()),
        window,
        AttachmentFlags::COLOR | AttachmentFlags::DEPTH,
        Config::default(),
    )
    .unwrap();
    assert!(without_depth.frames().iter().all(|f| !f.render_target().has_depth));
}

// ============================================================================
// FRAME CYCLE
// ============================================================================

#[test]
fn test_frame_cycle_event_order() {
    let (device, _window, mut context) = setup(2, None);
    device.clear_events();

    {
        let frame = context.begin_frame().unwrap();
        assert_eq!(frame.image_index, 0);
        assert_eq!(frame.frame_index, 0);
        assert_eq!(frame.extent, Extent2D::new(800, 600));
        assert_eq!(frame.format, TextureFormat::B8G8R8A8_UNORM);
        assert!(frame.recorder.is_recording());
    }
    assert_eq!(context.state(), FrameState::FrameAcquired);
    context.submit_frame().unwrap();
    assert_eq!(context.state(), FrameState::Idle);
    assert_eq!(context.semaphore_index(), 1);

    let image_acquired = context.semaphores()[0].image_acquired().id;
    let render_complete = context.semaphores()[0].render_complete().id;
    let fence = context.frames()[0].fence().id;
    let recorder = context.frames()[0].recorder().id;
    let swapchain = context.swapchain().unwrap().id;

    assert_eq!(
        device.events(),
        vec![
            MockEvent::Acquire { swapchain, semaphore: image_acquired },
            MockEvent::WaitFence { fence },
            MockEvent::AttachImage { semaphore: image_acquired },
            MockEvent::RecorderBegin { recorder },
            MockEvent::RecorderEnd { recorder },
            MockEvent::ResetFence { fence },
            MockEvent::Submit { recorder, wait: image_acquired, signal: render_complete, fence },
            MockEvent::FenceSignaled { fence },
            MockEvent::Present { swapchain, image_index: 0, semaphore: render_complete },
        ]
    );
    assert_eq!(context.stats().frames_submitted, 1);
}

#[test]
fn test_slot_fence_mapping_updated_on_acquire() {
    let (_device, _window, mut context) = setup(2, None);

    run_frame(&mut context);
    assert_eq!(context.slot_fences(), &[Some(0), None]);
    run_frame(&mut context);
    assert_eq!(context.slot_fences(), &[Some(0), Some(1)]);
}

#[test]
fn test_fence_gates_recorder_reuse() {
    let (device, _window, mut context) = setup(3, None);
    device.set_slow_gpu(true);
    device.clear_events();

    for _ in 0..12 {
        run_frame(&mut context);
    }

    // recorder -> fence of its last submission, until that fence is observed
    let mut in_flight: FxHashMap<u32, u32> = FxHashMap::default();
    for event in device.events() {
        match event {
            MockEvent::Submit { recorder, fence, .. } => {
                in_flight.insert(recorder, fence);
            }
            MockEvent::FenceSignaled { fence } => {
                in_flight.retain(|_, f| *f != fence);
            }
            MockEvent::RecorderBegin { recorder } => {
                assert!(
                    !in_flight.contains_key(&recorder),
                    "recorder {} reset while its fence was pending",
                    recorder
                );
            }
            _ => {}
        }
    }
    assert_eq!(device.count(|e| matches!(e, MockEvent::FenceSignaled { .. })), 9);
}

#[test]
fn test_semaphore_slots_independent_of_image_count() {
    let (device, _window, mut context) = setup(2, Some(3));
    assert_eq!(context.semaphore_slot_count(), 3);
    assert_eq!(context.frame_count(), 2);

    for k in 0..9usize {
        assert_eq!(context.semaphore_index(), k % 3);
        let image_index = context.begin_frame().unwrap().image_index;
        assert_eq!(image_index as usize, k % 2);
        assert_eq!(context.slot_fences()[k % 3], Some(k % 2));

        let expected = context.semaphores()[k % 3].image_acquired().id;
        let last_acquire = device
            .events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                MockEvent::Acquire { semaphore, .. } => Some(semaphore),
                _ => None,
            });
        assert_eq!(last_acquire, Some(expected));

        context.submit_frame().unwrap();
    }
}

// ============================================================================
// SURFACE CHANGES
// ============================================================================

#[test]
fn test_rebuild_is_idempotent() {
    let (device, _window, mut context) = setup(2, None);
    device.clear_events();

    assert!(!context.handle_surface_changes().unwrap());
    assert!(!context.handle_surface_changes().unwrap());

    assert_eq!(context.generation(), 1);
    assert_eq!(context.stats().surface_checks, 2);
    assert_eq!(context.stats().rebuilds, 0);
    assert_eq!(device.count(|e| matches!(e, MockEvent::CreateSwapchain { .. })), 0);
    assert_eq!(device.count(|e| matches!(e, MockEvent::WaitIdle)), 0);
}

#[test]
fn test_resize_triggers_full_rebuild() {
    let (device, window, mut context) = setup(3, None);
    run_frame(&mut context);
    run_frame(&mut context);
    assert_eq!(context.frame_index(), 1);
    assert_eq!(context.semaphore_index(), 2);
    let old_swapchain = context.swapchain().unwrap().id;
    device.clear_events();

    window.set_size(1024, 768);
    assert!(context.handle_surface_changes().unwrap());

    assert_eq!(context.extent(), Extent2D::new(1024, 768));
    assert_eq!(context.frame_index(), 0);
    assert_eq!(context.semaphore_index(), 0);
    assert_eq!(context.frame_count(), context.image_count());
    assert_eq!(context.semaphore_slot_count(), 3);
    assert!(context.slot_fences().iter().all(|s| s.is_none()));
    assert_eq!(context.generation(), 2);
    assert_eq!(context.stats().rebuilds, 1);

    let new_swapchain = context.swapchain().unwrap().id;
    let events = device.events();
    let idle = events.iter().position(|e| *e == MockEvent::WaitIdle).unwrap();
    let create = events
        .iter()
        .position(|e| matches!(e, MockEvent::CreateSwapchain { old: Some(old), .. } if *old == old_swapchain))
        .unwrap();
    let destroy = events
        .iter()
        .position(|e| *e == MockEvent::DestroySwapchain { swapchain: old_swapchain })
        .unwrap();
    assert!(idle < create && create < destroy);
    assert_ne!(new_swapchain, old_swapchain);

    // Next frame renders into the new swapchain from slot 0
    assert_eq!(run_frame(&mut context), 0);
}

#[test]
fn test_minimized_window_defers_rebuild() {
    let (device, window, mut context) = setup(2, None);
    device.clear_events();

    window.set_size(0, 0);
    assert!(!context.handle_surface_changes().unwrap());
    assert_eq!(context.generation(), 1);
    assert_eq!(device.count(|e| matches!(e, MockEvent::WaitIdle)), 0);

    window.set_size(640, 480);
    assert!(context.handle_surface_changes().unwrap());
    assert_eq!(context.extent(), Extent2D::new(640, 480));
    assert_eq!(context.generation(), 2);
}

#[test]
fn test_context_created_minimized_builds_later() {
    let device = MockDevice::new();
    let window = MockWindow::new(0, 0);
    let dyn_window: Arc<dyn Window> = window.clone();
    let mut context =
        RenderingContext::new(Arc::new(device), dyn_window, AttachmentFlags::COLOR, Config::default()).unwrap();

    assert_eq!(context.generation(), 0);
    assert_eq!(context.frame_count(), 0);
    assert!(matches!(context.begin_frame(), Err(Error::SwapchainOutOfDate)));
    assert_eq!(context.state(), FrameState::Idle);

    window.set_size(320, 240);
    assert_eq!(run_frame(&mut context), 0);
    assert_eq!(context.generation(), 1);
}

#[test]
fn test_suboptimal_acquire_checks_surface_once_and_retries_once() {
    let (device, _window, mut context) = setup(2, None);
    let before = context.stats();
    device.script_acquire([AcquireResult::Suboptimal]);

    let image_index = context.begin_frame().unwrap().image_index;
    assert_eq!(image_index, 0);

    let after = context.stats();
    assert_eq!(after.surface_checks - before.surface_checks, 1);
    assert_eq!(after.acquires - before.acquires, 2);
    assert_eq!(after.rebuilds - before.rebuilds, 1);
    assert_eq!(context.generation(), 2);
    context.submit_frame().unwrap();
}

#[test]
fn test_second_failed_acquire_skips_frame() {
    let (device, _window, mut context) = setup(2, None);
    device.script_acquire([AcquireResult::OutOfDate, AcquireResult::OutOfDate]);

    let result = context.begin_frame();
    assert!(matches!(result, Err(Error::SwapchainOutOfDate)));
    assert_eq!(context.state(), FrameState::Idle);
    assert_eq!(context.stats().acquires, 2);
    assert_eq!(context.stats().surface_checks, 1);

    // The next frame goes through normally
    run_frame(&mut context);
    assert_eq!(context.stats().frames_submitted, 1);
}

#[test]
fn test_present_out_of_date_rebuilds() {
    let (device, _window, mut context) = setup(2, None);
    device.script_present([PresentStatus::OutOfDate]);

    run_frame(&mut context);
    assert_eq!(context.generation(), 2);
    assert_eq!(context.semaphore_index(), 0);
    assert_eq!(context.frame_index(), 0);
    assert_eq!(context.stats().rebuilds, 1);
}

#[test]
fn test_present_suboptimal_while_minimized_advances() {
    let (device, window, mut context) = setup(2, None);
    device.script_present([PresentStatus::Suboptimal]);

    context.begin_frame().unwrap();
    window.set_size(0, 0);
    context.submit_frame().unwrap();

    assert_eq!(context.generation(), 1);
    assert_eq!(context.semaphore_index(), 1);
}

// ============================================================================
// STATE MACHINE PRECONDITIONS
// ============================================================================

#[test]
fn test_begin_frame_twice_is_invalid_state() {
    let (_device, _window, mut context) = setup(2, None);
    context.begin_frame().unwrap();

    assert!(matches!(context.begin_frame(), Err(Error::InvalidState(_))));
    assert_eq!(context.state(), FrameState::FrameAcquired);
    context.submit_frame().unwrap();
}

#[test]
fn test_submit_without_begin_is_invalid_state() {
    let (_device, _window, mut context) = setup(2, None);
    assert!(matches!(context.submit_frame(), Err(Error::InvalidState(_))));
    assert_eq!(context.state(), FrameState::Idle);
}

#[test]
fn test_surface_changes_during_frame_is_invalid_state() {
    let (_device, _window, mut context) = setup(2, None);
    context.begin_frame().unwrap();
    assert!(matches!(context.handle_surface_changes(), Err(Error::InvalidState(_))));
    context.submit_frame().unwrap();
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_hung_gpu_times_out_on_slot_fence() {
    let (device, _window, mut context) = setup(2, None);
    device.set_hung_gpu(true);

    run_frame(&mut context);
    run_frame(&mut context);

    let err = context.begin_frame().err().unwrap();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_transient());
    assert_eq!(context.state(), FrameState::Idle);
}

#[test]
fn test_submit_error_returns_to_idle() {
    let (device, _window, mut context) = setup(2, None);
    device.fail_next_submit();

    context.begin_frame().unwrap();
    assert_eq!(context.submit_frame(), Err(Error::DeviceLost));
    assert_eq!(context.state(), FrameState::Idle);
    assert!(context.has_stale_acquisition());

    // The unsubmitted acquisition is dropped with a rebuild before the next one
    run_frame(&mut context);
    run_frame(&mut context);
    assert_eq!(context.stats().frames_submitted, 2);
    assert_eq!(context.generation(), 2);
    assert!(!context.has_stale_acquisition());
    assert_no_semaphore_reacquired(&device.events());
}

#[test]
fn test_frame_fence_timeout_after_acquire_releases_slot() {
    let (device, _window, mut context) = setup(2, Some(3));
    device.set_hung_gpu(true);

    run_frame(&mut context);
    run_frame(&mut context);

    // Slot 2 is free, image 0 is not: the acquire succeeds, the frame fence times out
    let err = context.begin_frame().err().unwrap();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_transient());
    assert_eq!(context.state(), FrameState::Idle);
    assert_eq!(context.semaphore_index(), 2);
    assert!(context.has_stale_acquisition());
    assert_eq!(context.generation(), 1);

    let wait_idles_before = device.count(|e| matches!(e, MockEvent::WaitIdle));
    context.begin_frame().unwrap();
    assert_eq!(device.count(|e| matches!(e, MockEvent::WaitIdle)), wait_idles_before + 1);
    assert_eq!(context.generation(), 2);
    assert!(!context.has_stale_acquisition());
    context.submit_frame().unwrap();

    assert_no_semaphore_reacquired(&device.events());
}

#[test]
fn test_stale_acquisition_waits_for_window_area() {
    let (device, window, mut context) = setup(2, None);
    device.fail_next_submit();

    context.begin_frame().unwrap();
    assert!(context.submit_frame().is_err());

    window.set_size(0, 0);
    assert!(matches!(context.begin_frame(), Err(Error::SwapchainOutOfDate)));
    assert!(context.has_stale_acquisition());
    assert_eq!(context.stats().acquires, 1);

    window.set_size(800, 600);
    run_frame(&mut context);
    assert_eq!(context.generation(), 2);
    assert_no_semaphore_reacquired(&device.events());
}

#[test]
fn test_failed_fence_replacement_recovers_through_rebuild() {
    let (device, _window, mut context) = setup(2, None);
    device.fail_next_submit();
    device.set_fail_fence_creation(true);

    context.begin_frame().unwrap();
    assert_eq!(context.submit_frame(), Err(Error::DeviceLost));
    device.set_fail_fence_creation(false);

    // Frame 0 kept its reset fence; the rebuild replaces it instead of timing out
    run_frame(&mut context);
    run_frame(&mut context);
    run_frame(&mut context);
    assert_eq!(context.stats().frames_submitted, 3);
}

#[test]
fn test_swapchain_creation_failure_is_recoverable() {
    let (device, window, mut context) = setup(2, None);
    device.set_fail_swapchain_creation(true);
    window.set_size(1024, 768);

    assert!(matches!(context.handle_surface_changes(), Err(Error::BackendError(_))));
    assert!(context.swapchain().is_none());
    assert_eq!(context.frame_count(), 0);
    assert!(context.begin_frame().is_err());

    device.set_fail_swapchain_creation(false);
    run_frame(&mut context);
    assert_eq!(context.extent(), Extent2D::new(1024, 768));
}

// ============================================================================
// CLONING & TEARDOWN
// ============================================================================

#[test]
fn test_clone_shares_only_the_device() {
    let (device, _window, mut main) = setup(2, None);
    let second_window = MockWindow::new(300, 200);
    let dyn_window: Arc<dyn Window> = second_window.clone();

    let mut secondary = main.clone_for_window(dyn_window, AttachmentFlags::COLOR).unwrap();

    assert_ne!(main.id(), secondary.id());
    assert!(Arc::ptr_eq(main.device(), secondary.device()));
    assert_eq!(Arc::strong_count(main.device()), 2);
    assert_ne!(main.surface().id, secondary.surface().id);
    assert_ne!(main.swapchain().unwrap().id, secondary.swapchain().unwrap().id);
    assert_eq!(secondary.extent(), Extent2D::new(300, 200));
    assert_eq!(secondary.config().fence_timeout, main.config().fence_timeout);

    // Frames and rebuilds on one context leave the other untouched
    run_frame(&mut secondary);
    second_window.set_size(400, 300);
    assert!(secondary.handle_surface_changes().unwrap());
    assert_eq!(secondary.generation(), 2);
    assert_eq!(main.generation(), 1);
    assert_eq!(main.semaphore_index(), 0);
    assert_eq!(main.stats().frames_submitted, 0);

    drop(secondary);
    assert_eq!(Arc::strong_count(main.device()), 1);
    run_frame(&mut main);
    assert_eq!(device.count(|e| matches!(e, MockEvent::Present { .. })), 2);
}

#[test]
fn test_drop_idles_device_before_destroying_swapchain() {
    let (device, _window, mut context) = setup(2, None);
    run_frame(&mut context);
    let swapchain = context.swapchain().unwrap().id;
    device.clear_events();

    drop(context);

    let events = device.events();
    assert_eq!(events.first(), Some(&MockEvent::WaitIdle));
    assert!(events.contains(&MockEvent::DestroySwapchain { swapchain }));
}

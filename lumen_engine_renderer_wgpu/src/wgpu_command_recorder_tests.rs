//! Unit tests for wgpu_command_recorder.rs (state rules and clamping, no GPU)

use super::*;

fn viewport(x: f32, y: f32, width: f32, height: f32) -> Viewport {
    Viewport { x, y, width, height, min_depth: 0.0, max_depth: 1.0 }
}

#[test]
fn test_idle_recorder_rejects_commands() {
    let state = RecordingState::default();
    assert!(matches!(state.require_recording("set_viewport"), Err(Error::InvalidState(_))));
    assert!(matches!(state.require_render_pass("draw_indexed"), Err(Error::InvalidState(_))));
}

#[test]
fn test_end_rejected_inside_render_pass() {
    let state = RecordingState { recording: true, in_render_pass: true };
    assert!(state.require_render_pass("draw_indexed").is_ok());
    assert!(matches!(state.require_no_render_pass("end"), Err(Error::InvalidState(_))));
}

#[test]
fn test_open_pass_requires_render_pass_state() {
    let state = RecordingState { recording: true, in_render_pass: false };
    let mut pass = None;
    assert!(matches!(open_pass(&state, &mut pass, "draw_indexed"), Err(Error::InvalidState(_))));
}

#[test]
fn test_color_load_op() {
    assert!(matches!(color_load_op(None), wgpu::LoadOp::Load));
    match color_load_op(Some([0.25, 0.5, 0.75, 1.0])) {
        wgpu::LoadOp::Clear(color) => {
            assert_eq!(color.r, 0.25);
            assert_eq!(color.g, 0.5);
            assert_eq!(color.b, 0.75);
            assert_eq!(color.a, 1.0);
        }
        other => panic!("expected a clear, got {:?}", other),
    }
}

#[test]
fn test_viewport_inside_target_is_unchanged() {
    let vp = clamp_viewport(viewport(10.0, 20.0, 100.0, 50.0), Extent2D::new(800, 600)).unwrap();
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (10.0, 20.0, 100.0, 50.0));
    assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
}

#[test]
fn test_viewport_clamped_to_target() {
    let vp = clamp_viewport(viewport(-10.0, 500.0, 200.0, 200.0), Extent2D::new(800, 600)).unwrap();
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (0.0, 500.0, 190.0, 100.0));
}

#[test]
fn test_viewport_outside_target_is_dropped() {
    assert!(clamp_viewport(viewport(900.0, 0.0, 100.0, 100.0), Extent2D::new(800, 600)).is_none());
    assert!(clamp_viewport(viewport(0.0, 0.0, 0.0, 100.0), Extent2D::new(800, 600)).is_none());
}

#[test]
fn test_scissor_clamped_to_target() {
    let extent = Extent2D::new(800, 600);
    assert_eq!(clamp_scissor(Rect2D { x: 10, y: 10, width: 50, height: 60 }, extent), (10, 10, 50, 60));
    assert_eq!(clamp_scissor(Rect2D { x: -20, y: 0, width: 100, height: 700 }, extent), (0, 0, 80, 600));
    assert_eq!(clamp_scissor(Rect2D { x: 790, y: 590, width: 100, height: 100 }, extent), (790, 590, 10, 10));
}

#[test]
fn test_scissor_outside_target_is_empty() {
    let extent = Extent2D::new(800, 600);
    let (_, _, width, height) = clamp_scissor(Rect2D { x: 1000, y: 0, width: 10, height: 10 }, extent);
    assert_eq!(width, 0);
    assert_eq!(height, 10);
    let (_, _, width, _) = clamp_scissor(Rect2D { x: -50, y: 0, width: 10, height: 10 }, extent);
    assert_eq!(width, 0);
}

#[test]
fn test_push_slot_stride_respects_alignment() {
    assert_eq!(push_slot_stride(256), 256);
    assert_eq!(push_slot_stride(64), 128);
    assert_eq!(push_slot_stride(0), 128);
}

//! Unit tests for vulkan_command_recorder.rs (state rules, no GPU)

use super::*;

#[test]
fn test_idle_recorder_rejects_commands() {
    let state = RecordingState::default();
    assert!(matches!(state.require_recording("set_viewport"), Err(Error::InvalidState(_))));
    assert!(matches!(state.require_render_pass("draw_indexed"), Err(Error::InvalidState(_))));
}

#[test]
fn test_draw_requires_render_pass() {
    let state = RecordingState { recording: true, in_render_pass: false };
    assert!(state.require_recording("bind_vertex_buffer").is_ok());
    assert!(matches!(state.require_render_pass("draw_indexed"), Err(Error::InvalidState(_))));
}

#[test]
fn test_end_rejected_inside_render_pass() {
    let state = RecordingState { recording: true, in_render_pass: true };
    assert!(state.require_render_pass("draw_indexed").is_ok());
    assert!(matches!(state.require_no_render_pass("end"), Err(Error::InvalidState(_))));
}

#[test]
fn test_clear_values_color_only() {
    let values = clear_values(Some([0.1, 0.2, 0.3, 1.0]), false);
    assert_eq!(values.len(), 1);
    assert_eq!(unsafe { values[0].color.float32 }, [0.1, 0.2, 0.3, 1.0]);
}

#[test]
fn test_clear_values_with_depth() {
    let values = clear_values(None, true);
    assert_eq!(values.len(), 2);
    let depth = unsafe { values[1].depth_stencil };
    assert_eq!(depth.depth, 1.0);
    assert_eq!(depth.stencil, 0);
}

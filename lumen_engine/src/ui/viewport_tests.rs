//! Unit tests for viewport.rs

use std::sync::Arc;
use glam::Vec2;
use crate::config::Config;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockDevice, MockEvent, MockWindow};
use crate::graphics_device::{AcquireResult, AttachmentFlags, ShaderSource, TextureFormat, Window};
use crate::rendering_context::RenderingContext;
use crate::ui::{DrawData, UiRenderer, UiRendererDesc, ViewportId, ViewportRegistry};

fn setup() -> (MockDevice, ViewportRegistry<MockDevice>, UiRenderer<MockDevice>, ViewportId) {
    let device = MockDevice::new();
    let shared = Arc::new(device.clone());
    let window: Arc<dyn Window> = MockWindow::new(800, 600);
    let context = RenderingContext::new(shared.clone(), window, AttachmentFlags::COLOR, Config::default()).unwrap();
    let ui = UiRenderer::new(
        shared,
        UiRendererDesc {
            shader: ShaderSource::Wgsl(String::new()),
            color_format: TextureFormat::B8G8R8A8_UNORM,
            attachments: AttachmentFlags::COLOR,
            clear_color: None,
        },
    )
    .unwrap();
    let mut registry = ViewportRegistry::new();
    let main = registry.insert_main(context).unwrap();
    (device, registry, ui, main)
}

fn secondary(registry: &mut ViewportRegistry<MockDevice>) -> ViewportId {
    let window: Arc<dyn Window> = MockWindow::new(320, 240);
    registry.create_viewport(window, AttachmentFlags::COLOR).unwrap()
}

fn empty_frame(width: f32, height: f32) -> DrawData {
    DrawData::new(Vec2::ZERO, Vec2::new(width, height), Vec2::ONE)
}

#[test]
fn test_main_viewport_is_unique() {
    let (device, mut registry, _ui, main) = setup();
    assert_eq!(registry.main_viewport(), Some(main));

    let window: Arc<dyn Window> = MockWindow::new(100, 100);
    let extra = RenderingContext::new(Arc::new(device), window, AttachmentFlags::COLOR, Config::default()).unwrap();
    assert!(matches!(registry.insert_main(extra), Err(Error::InvalidState(_))));
}

#[test]
fn test_create_viewport_clones_main_context() {
    let (_device, mut registry, _ui, main) = setup();
    let id = secondary(&mut registry);

    assert_eq!(registry.len(), 2);
    let main_ctx = registry.context(main).unwrap();
    let second_ctx = registry.context(id).unwrap();
    assert!(Arc::ptr_eq(main_ctx.device(), second_ctx.device()));
    assert_ne!(main_ctx.id(), second_ctx.id());
    assert_eq!(second_ctx.extent().width, 320);
}

#[test]
fn test_create_viewport_requires_main() {
    let mut registry: ViewportRegistry<MockDevice> = ViewportRegistry::new();
    let window: Arc<dyn Window> = MockWindow::new(100, 100);
    assert!(matches!(
        registry.create_viewport(window, AttachmentFlags::COLOR),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_destroy_viewport_releases_ui_buffers() {
    let (_device, mut registry, mut ui, main) = setup();
    let id = secondary(&mut registry);
    let context_id = registry.context(id).unwrap().id();

    registry.render_viewport(id, &mut ui, &empty_frame(320.0, 240.0)).unwrap();
    assert!(ui.has_context_buffers(context_id));
    registry.destroy_viewport(id, &mut ui).unwrap();

    assert!(!registry.contains(id));
    assert!(!ui.has_context_buffers(context_id));
    assert!(matches!(registry.destroy_viewport(main, &mut ui), Err(Error::InvalidState(_))));
    assert!(matches!(registry.destroy_viewport(id, &mut ui), Err(Error::InvalidResource(_))));
}

#[test]
fn test_render_viewport_submits_and_presents() {
    let (device, mut registry, mut ui, main) = setup();
    registry.render_viewport(main, &mut ui, &empty_frame(800.0, 600.0)).unwrap();

    assert_eq!(device.count(|e| matches!(e, MockEvent::Present { .. })), 1);
    assert_eq!(registry.context(main).unwrap().stats().frames_submitted, 1);
}

#[test]
fn test_render_all_drops_failing_secondary() {
    let (device, mut registry, mut ui, main) = setup();
    let id = secondary(&mut registry);
    let frame = empty_frame(320.0, 240.0);

    device.fail_next_submit();
    let dropped = registry.render_all(&mut ui, &[(id, &frame)]).unwrap();

    assert_eq!(dropped, vec![id]);
    assert!(!registry.contains(id));
    assert!(registry.contains(main));
}

#[test]
fn test_render_all_propagates_main_failure() {
    let (device, mut registry, mut ui, main) = setup();
    let frame = empty_frame(800.0, 600.0);

    device.fail_next_submit();
    let result = registry.render_all(&mut ui, &[(main, &frame)]);

    assert_eq!(result, Err(Error::DeviceLost));
    assert!(registry.contains(main));
}

#[test]
fn test_render_all_skips_transient_failures() {
    let (device, mut registry, mut ui, main) = setup();
    let id = secondary(&mut registry);
    let main_frame = empty_frame(800.0, 600.0);
    let second_frame = empty_frame(320.0, 240.0);

    // Main acquires first; the secondary gets two out-of-date results
    device.script_acquire([AcquireResult::Acquired(0), AcquireResult::OutOfDate, AcquireResult::OutOfDate]);
    let dropped = registry
        .render_all(&mut ui, &[(main, &main_frame), (id, &second_frame)])
        .unwrap();

    assert!(dropped.is_empty());
    assert!(registry.contains(id));
    assert_eq!(registry.context(main).unwrap().stats().frames_submitted, 1);
    assert_eq!(registry.context(id).unwrap().stats().frames_submitted, 0);
}

#[test]
fn test_handle_surface_changes_all_counts_rebuilds() {
    let (_device, mut registry, _ui, _main) = setup();
    let window = MockWindow::new(320, 240);
    let dyn_window: Arc<dyn Window> = window.clone();
    registry.create_viewport(dyn_window, AttachmentFlags::COLOR).unwrap();

    assert_eq!(registry.handle_surface_changes_all().unwrap(), 0);
    window.set_size(640, 480);
    assert_eq!(registry.handle_surface_changes_all().unwrap(), 1);
}

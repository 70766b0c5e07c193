//! winit application driving the main window and a secondary viewport

use anyhow::{Context, Result};
use lumen_engine::glam::Vec2;
use lumen_engine::lumen::render::{AttachmentFlags, Window as EngineWindow};
use lumen_engine::lumen::{Config, RenderingContext};
use lumen_engine::ui::{TextureId, UiRenderer, UiRendererDesc, ViewportId, ViewportRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::DemoBackend;
use crate::scene;
use crate::settings::DemoSettings;

struct DemoWindow {
    window: Arc<Window>,
    viewport: ViewportId,
    is_main: bool,
}

/// Device, UI renderer and one rendering context per window
struct Renderer<D: DemoBackend> {
    device: Arc<D>,
    ui: UiRenderer<D>,
    viewports: ViewportRegistry<D>,
    windows: HashMap<WindowId, DemoWindow>,
    white: TextureId,
}

fn create_window(event_loop: &ActiveEventLoop, title: &str, size: LogicalSize<f64>) -> Result<Arc<Window>> {
    let attrs = Window::default_attributes().with_title(title).with_inner_size(size);
    let window = event_loop.create_window(attrs).context("failed to create window")?;
    Ok(Arc::new(window))
}

impl<D: DemoBackend> Renderer<D> {
    fn new(event_loop: &ActiveEventLoop, settings: &DemoSettings, config: &Config) -> Result<Self> {
        let main_window = create_window(event_loop, "Lumen Demo", LogicalSize::new(1280.0, 720.0))?;
        let main_handle: Arc<dyn EngineWindow> = main_window.clone();

        let device = Arc::new(
            D::create(&main_handle, config).with_context(|| format!("failed to create the {} device", D::NAME))?,
        );
        let context = RenderingContext::new(Arc::clone(&device), main_handle, AttachmentFlags::COLOR, config.clone())
            .context("failed to create the main rendering context")?;
        let color_format = context.format().context("main window has no surface yet")?;

        let shader = D::ui_shader(settings).context("failed to load the UI shader")?;
        let mut ui = UiRenderer::new(
            Arc::clone(&device),
            UiRendererDesc {
                shader,
                color_format,
                attachments: AttachmentFlags::COLOR,
                clear_color: Some(config.clear_color),
            },
        )
        .context("failed to create the UI renderer")?;
        let white = ui.upload_fonts(&scene::white_atlas())?;

        let mut viewports = ViewportRegistry::new();
        let main_viewport = viewports.insert_main(context)?;
        let mut windows = HashMap::new();
        windows.insert(main_window.id(), DemoWindow { window: main_window, viewport: main_viewport, is_main: true });

        let mut renderer = Self { device, ui, viewports, windows, white };

        // The demo keeps running on the main window alone
        if let Err(e) = renderer.open_viewport(event_loop) {
            log::warn!("secondary viewport unavailable: {:#}", e);
        }

        log::info!("{} renderer ready with {} viewport(s)", D::NAME, renderer.viewports.len());
        Ok(renderer)
    }

    fn open_viewport(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = create_window(event_loop, "Lumen Viewport", LogicalSize::new(480.0, 360.0))?;
        let handle: Arc<dyn EngineWindow> = window.clone();
        let viewport = self.viewports.create_viewport(handle, AttachmentFlags::COLOR)?;
        self.windows.insert(window.id(), DemoWindow { window, viewport, is_main: false });
        Ok(())
    }

    fn close_viewport(&mut self, id: WindowId) {
        if let Some(closed) = self.windows.remove(&id) {
            if let Err(e) = self.viewports.destroy_viewport(closed.viewport, &mut self.ui) {
                log::warn!("failed to destroy viewport {:?}: {}", closed.viewport, e);
            }
        }
    }

    fn is_main(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.is_main)
    }

    fn request_redraw_all(&self) {
        for entry in self.windows.values() {
            entry.window.request_redraw();
        }
    }

    fn resized(&mut self, id: WindowId) -> Result<()> {
        let Some(entry) = self.windows.get(&id) else {
            return Ok(());
        };
        if let Some(context) = self.viewports.context_mut(entry.viewport) {
            if context.handle_surface_changes()? {
                log::debug!("window {:?} rebuilt to {:?}", id, context.extent());
            }
        }
        entry.window.request_redraw();
        Ok(())
    }

    /// Draw one window; an error means the demo must stop
    fn redraw(&mut self, id: WindowId, time: f32) -> Result<()> {
        let Some(entry) = self.windows.get(&id) else {
            return Ok(());
        };
        let size = entry.window.inner_size();
        let scale = entry.window.scale_factor() as f32;
        let display_size = Vec2::new(size.width as f32, size.height as f32) / scale;
        let draw_data = if entry.is_main {
            scene::main_scene(display_size, scale, time, self.white)
        } else {
            scene::viewport_scene(display_size, scale, time, self.white)
        };
        let (viewport, is_main) = (entry.viewport, entry.is_main);

        match self.viewports.render_viewport(viewport, &mut self.ui, &draw_data) {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                log::debug!("window {:?} skipped a frame: {}", id, e);
                Ok(())
            }
            Err(e) if is_main => Err(e).context("main viewport failed"),
            Err(e) => {
                log::error!("secondary viewport failed and is closed: {}", e);
                self.close_viewport(id);
                Ok(())
            }
        }
    }
}

impl<D: DemoBackend> Drop for Renderer<D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::warn!("device did not go idle before shutdown: {}", e);
        }
    }
}

/// Application state handed to the winit event loop
pub struct DemoApp<D: DemoBackend> {
    settings: DemoSettings,
    config: Config,
    renderer: Option<Renderer<D>>,
    start: Instant,
    failure: Option<anyhow::Error>,
}

impl<D: DemoBackend> DemoApp<D> {
    pub fn new(settings: DemoSettings, config: Config) -> Self {
        Self { settings, config, renderer: None, start: Instant::now(), failure: None }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        self.renderer = None;
        event_loop.exit();
    }
}

impl<D: DemoBackend> ApplicationHandler for DemoApp<D> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match Renderer::new(event_loop, &self.settings, &self.config) {
            Ok(renderer) => {
                renderer.request_redraw_all();
                self.renderer = Some(renderer);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(renderer) = &self.renderer {
            renderer.request_redraw_all();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let time = self.start.elapsed().as_secs_f32();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested if renderer.is_main(window_id) => {
                self.renderer = None;
                event_loop.exit();
                return;
            }
            WindowEvent::CloseRequested => {
                renderer.close_viewport(window_id);
                Ok(())
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => renderer.resized(window_id),
            WindowEvent::RedrawRequested => renderer.redraw(window_id, time),
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }
}

/// Run the demo on backend `D` until the main window closes
pub fn run<D: DemoBackend>(settings: DemoSettings, config: Config) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = DemoApp::<D>::new(settings, config);

    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    app.renderer = None;
    D::report();
    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

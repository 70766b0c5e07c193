/// Viewport side-table - one rendering context per UI viewport window
///
/// The UI library identifies its platform windows by `ViewportId`; the engine
/// keeps the per-viewport rendering data here instead of in opaque user-data
/// pointers.

use std::sync::Arc;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::graphics_device::{AttachmentFlags, GraphicsDevice, Window};
use crate::rendering_context::RenderingContext;
use crate::ui::{DrawData, UiRenderer, ViewportId};
use crate::{engine_debug, engine_error, engine_info};

const SOURCE: &str = "lumen::ViewportRegistry";

/// Rendering data of one viewport
pub struct ViewportData<D: GraphicsDevice> {
    pub context: RenderingContext<D>,
    /// The main viewport's context is owned by the application window
    pub is_main: bool,
}

/// Registry of UI viewports and their rendering contexts
pub struct ViewportRegistry<D: GraphicsDevice> {
    viewports: SlotMap<ViewportId, ViewportData<D>>,
    main: Option<ViewportId>,
}

impl<D: GraphicsDevice> Default for ViewportRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: GraphicsDevice> ViewportRegistry<D> {
    pub fn new() -> Self {
        Self { viewports: SlotMap::with_key(), main: None }
    }

    /// Register the main window's context
    pub fn insert_main(&mut self, context: RenderingContext<D>) -> Result<ViewportId> {
        if self.main.is_some() {
            return Err(Error::InvalidState("main viewport already registered".to_string()));
        }
        let id = self.viewports.insert(ViewportData { context, is_main: true });
        self.main = Some(id);
        Ok(id)
    }

    pub fn main_viewport(&self) -> Option<ViewportId> {
        self.main
    }

    /// Create a secondary viewport by cloning the main context for `window`
    pub fn create_viewport(&mut self, window: Arc<dyn Window>, attachments: AttachmentFlags) -> Result<ViewportId> {
        let main = self
            .main
            .and_then(|id| self.viewports.get(id))
            .ok_or_else(|| Error::InvalidState("no main viewport to clone".to_string()))?;

        let context = main.context.clone_for_window(window, attachments)?;
        let id = self.viewports.insert(ViewportData { context, is_main: false });
        engine_info!(SOURCE, "Viewport {:?} created", id);
        Ok(id)
    }

    /// Destroy a secondary viewport and release its UI buffers
    pub fn destroy_viewport(&mut self, id: ViewportId, ui: &mut UiRenderer<D>) -> Result<()> {
        if self.main == Some(id) {
            return Err(Error::InvalidState("the main viewport cannot be destroyed".to_string()));
        }
        let data = self
            .viewports
            .remove(id)
            .ok_or_else(|| Error::InvalidResource(format!("unknown viewport {:?}", id)))?;
        ui.release_context(data.context.id());
        engine_debug!(SOURCE, "Viewport {:?} destroyed", id);
        Ok(())
    }

    pub fn contains(&self, id: ViewportId) -> bool {
        self.viewports.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ViewportId> + '_ {
        self.viewports.keys()
    }

    pub fn context(&self, id: ViewportId) -> Option<&RenderingContext<D>> {
        self.viewports.get(id).map(|d| &d.context)
    }

    pub fn context_mut(&mut self, id: ViewportId) -> Option<&mut RenderingContext<D>> {
        self.viewports.get_mut(id).map(|d| &mut d.context)
    }

    /// Begin, record and submit one frame of a viewport
    pub fn render_viewport(&mut self, id: ViewportId, ui: &mut UiRenderer<D>, draw_data: &DrawData) -> Result<()> {
        let context = self
            .context_mut(id)
            .ok_or_else(|| Error::InvalidResource(format!("unknown viewport {:?}", id)))?;
        let context_id = context.id();

        let recorded = {
            let mut frame = context.begin_frame()?;
            ui.record(&mut frame, context_id, draw_data)
        };
        // Submit even a partially recorded frame so the acquired image is released
        let submitted = context.submit_frame();
        recorded.and(submitted)
    }

    /// Render several viewports
    ///
    /// Transient errors skip that viewport's frame. Any other failure of a
    /// secondary viewport destroys it; a failure of the main viewport is
    /// returned. Returns the destroyed viewports.
    pub fn render_all(&mut self, ui: &mut UiRenderer<D>, frames: &[(ViewportId, &DrawData)]) -> Result<Vec<ViewportId>> {
        let mut dropped = Vec::new();
        for &(id, draw_data) in frames {
            if !self.contains(id) {
                continue;
            }
            match self.render_viewport(id, ui, draw_data) {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    engine_debug!(SOURCE, "Viewport {:?} skipped a frame: {}", id, e);
                }
                Err(e) if self.main == Some(id) => return Err(e),
                Err(e) => {
                    engine_error!(SOURCE, "Viewport {:?} failed and is dropped: {}", id, e);
                    self.destroy_viewport(id, ui)?;
                    dropped.push(id);
                }
            }
        }
        Ok(dropped)
    }

    /// Check every viewport's surface, returns how many were rebuilt
    pub fn handle_surface_changes_all(&mut self) -> Result<usize> {
        let mut rebuilt = 0;
        for data in self.viewports.values_mut() {
            if data.context.handle_surface_changes()? {
                rebuilt += 1;
            }
        }
        Ok(rebuilt)
    }
}

#[cfg(test)]
#[path = "viewport_tests.rs"]
mod tests;

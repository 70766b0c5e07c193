/// RenderingContext - swapchain, frame objects and the begin/submit state machine
///
/// One context drives one window. The device is shared through `Arc` between
/// the main context and its clones; everything else (surface, swapchain,
/// frame objects, semaphores) is owned exclusively.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::graphics_device::{
    resolve_extent, AcquireResult, AttachmentFlags, CommandRecorder, Extent2D, GraphicsDevice,
    PresentStatus, Swapchain, SwapchainDesc, TextureFormat, Window,
};
use crate::rendering_context::{FrameHandle, FrameObjects, FrameSemaphores};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const SOURCE: &str = "lumen::RenderingContext";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame in flight on the CPU side
    Idle,
    /// `begin_frame` succeeded, commands are being recorded
    FrameAcquired,
    /// Recording ended, submission/presentation in progress
    FrameRecorded,
}

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Calls to `handle_surface_changes`
    pub surface_checks: u64,
    /// Rebuilds performed by `handle_surface_changes`
    pub rebuilds: u64,
    /// Image acquisitions attempted
    pub acquires: u64,
    /// Frames submitted to the GPU
    pub frames_submitted: u64,
}

/// Per-window rendering context
///
/// # Frame protocol
///
/// ```text
/// Idle --begin_frame--> FrameAcquired --submit_frame--> FrameRecorded --> Idle
/// ```
///
/// `handle_surface_changes` (and rebuilds triggered by suboptimal/out-of-date
/// statuses) only run from `Idle`.
///
/// Field order is the teardown order after the device has been idled.
pub struct RenderingContext<D: GraphicsDevice> {
    frames: Vec<FrameObjects<D>>,
    semaphores: Vec<FrameSemaphores<D>>,
    swapchain: Option<D::Swapchain>,
    surface: D::Surface,
    window: Arc<dyn Window>,
    device: Arc<D>,

    config: Config,
    attachments: AttachmentFlags,
    /// Frame whose fence guards each semaphore slot
    slot_fences: Vec<Option<usize>>,
    frame_index: usize,
    semaphore_index: usize,
    state: FrameState,
    /// Set after a suboptimal/out-of-date status until the next rebuild
    surface_dirty: bool,
    /// An image was acquired but its frame never reached submission; the
    /// slot's semaphores are stale until the next rebuild
    stale_acquisition: bool,
    generation: u64,
    id: ContextId,
    stats: ContextStats,
}

impl<D: GraphicsDevice> RenderingContext<D> {
    /// Create a context for a window
    ///
    /// Creates the surface and builds the swapchain, frame objects and
    /// semaphores. A minimized window defers the build to the first
    /// `handle_surface_changes` / `begin_frame` with a non-zero extent.
    pub fn new(
        device: Arc<D>,
        window: Arc<dyn Window>,
        attachments: AttachmentFlags,
        config: Config,
    ) -> Result<Self> {
        let surface = device.create_surface(&window)?;

        let mut context = Self {
            frames: Vec::new(),
            semaphores: Vec::new(),
            swapchain: None,
            surface,
            window,
            device,
            config,
            attachments,
            slot_fences: Vec::new(),
            frame_index: 0,
            semaphore_index: 0,
            state: FrameState::Idle,
            surface_dirty: false,
            stale_acquisition: false,
            generation: 0,
            id: ContextId::next(),
            stats: ContextStats::default(),
        };

        let extent = context.live_extent()?;
        if extent.is_empty() {
            engine_info!(SOURCE, "Context {} created for a minimized window, build deferred", context.id.0);
        } else {
            context.build_frame_objects(extent)?;
        }

        Ok(context)
    }

    /// Create a context for another window sharing this context's device
    ///
    /// Only the device and the configuration are shared: the new context owns
    /// its own surface, swapchain, frame objects and semaphores.
    pub fn clone_for_window(&self, window: Arc<dyn Window>, attachments: AttachmentFlags) -> Result<Self> {
        engine_debug!(SOURCE, "Cloning context {} for a new window", self.id.0);
        Self::new(self.device.clone(), window, attachments, self.config.clone())
    }

    // ===== SURFACE CHANGES =====

    /// Rebuild the swapchain and frame objects if the surface changed
    ///
    /// Returns `Ok(true)` when a rebuild happened. Nothing happens when the
    /// extent still matches and no suboptimal/out-of-date status is pending,
    /// or when the window is minimized (zero extent).
    pub fn handle_surface_changes(&mut self) -> Result<bool> {
        if self.state != FrameState::Idle {
            return Err(Error::InvalidState(format!(
                "handle_surface_changes called in state {:?}",
                self.state
            )));
        }
        self.stats.surface_checks += 1;

        let extent = self.live_extent()?;
        if let Some(swapchain) = &self.swapchain {
            if !self.surface_dirty && swapchain.requested_extent() == extent {
                return Ok(false);
            }
        }
        if extent.is_empty() {
            engine_debug!(SOURCE, "Surface has zero extent, rebuild deferred");
            return Ok(false);
        }

        self.device.wait_idle()?;
        self.build_frame_objects(extent)?;
        self.stats.rebuilds += 1;
        Ok(true)
    }

    /// Extent of the surface right now
    fn live_extent(&self) -> Result<Extent2D> {
        let caps = self.device.surface_capabilities(&self.surface)?;
        Ok(resolve_extent(&caps, self.window.drawable_size()))
    }

    /// Build a new generation of swapchain, frame objects and semaphores
    ///
    /// The caller makes sure the device is idle. The old swapchain is handed to
    /// the backend and dropped once the new one exists.
    fn build_frame_objects(&mut self, extent: Extent2D) -> Result<()> {
        self.frames.clear();
        self.semaphores.clear();
        self.slot_fences.clear();

        let desc = SwapchainDesc {
            requested_extent: extent,
            preferred_formats: self.config.preferred_surface_formats.clone(),
            present_modes: self.config.present_modes.clone(),
            min_image_count: self.config.min_image_count,
        };

        let swapchain = match self.device.create_swapchain(&self.surface, &desc, self.swapchain.as_ref()) {
            Ok(swapchain) => swapchain,
            Err(e) => {
                // Without frame objects the old swapchain is unusable
                self.swapchain = None;
                engine_error!(SOURCE, "Swapchain creation failed for {}x{}: {}", extent.width, extent.height, e);
                return Err(e);
            }
        };
        self.swapchain = None;

        let image_count = swapchain.image_count();
        let mut frames = Vec::with_capacity(image_count);
        for image_index in 0..image_count {
            frames.push(FrameObjects::new(&*self.device, &swapchain, image_index as u32, self.attachments)?);
        }

        let slot_count = self.device.semaphore_slot_count(image_count).max(1);
        let mut semaphores = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            semaphores.push(FrameSemaphores::new(&*self.device)?);
        }

        engine_info!(
            SOURCE,
            "Context {} built: {}x{}, {} images, {} semaphore slots, {:?}, {:?}",
            self.id.0,
            swapchain.extent().width,
            swapchain.extent().height,
            image_count,
            slot_count,
            swapchain.format(),
            swapchain.present_mode()
        );

        self.swapchain = Some(swapchain);
        self.frames = frames;
        self.semaphores = semaphores;
        self.slot_fences = vec![None; slot_count];
        self.frame_index = 0;
        self.semaphore_index = 0;
        self.surface_dirty = false;
        self.stale_acquisition = false;
        self.generation += 1;
        Ok(())
    }

    // ===== FRAME LIFECYCLE =====

    /// Acquire the next image and start recording its frame
    ///
    /// A suboptimal/out-of-date swapchain is rebuilt and the acquisition is
    /// retried once. If that still fails `Error::SwapchainOutOfDate` is
    /// returned: skip the frame and try again later. Any failure after the
    /// image was acquired forces a rebuild before the next acquisition.
    pub fn begin_frame(&mut self) -> Result<FrameHandle<'_, D>> {
        if self.state != FrameState::Idle {
            return Err(Error::InvalidState(format!("begin_frame called in state {:?}", self.state)));
        }

        if self.swapchain.is_none() && !self.handle_surface_changes()? {
            return Err(Error::SwapchainOutOfDate);
        }

        // A dangling acquisition is only cleared by fresh semaphores
        if self.stale_acquisition {
            self.surface_dirty = true;
            if !self.handle_surface_changes()? {
                return Err(Error::SwapchainOutOfDate);
            }
        }

        let image_index = match self.acquire()? {
            AcquireResult::Acquired(index) => index,
            status => {
                engine_debug!(SOURCE, "Acquire returned {:?}, checking surface", status);
                self.surface_dirty = true;
                self.handle_surface_changes()?;
                match self.acquire()? {
                    AcquireResult::Acquired(index) => index,
                    status => {
                        engine_warn!(SOURCE, "Acquire returned {:?} after rebuild, skipping frame", status);
                        return Err(Error::SwapchainOutOfDate);
                    }
                }
            }
        };

        let frame_index = image_index as usize;
        if let Err(e) = self.start_frame(frame_index) {
            self.abandon_acquisition(&e);
            return Err(e);
        }
        self.state = FrameState::FrameAcquired;

        let (extent, format) = match &self.swapchain {
            Some(swapchain) => (swapchain.extent(), swapchain.format()),
            None => (Extent2D::default(), TextureFormat::Undefined),
        };
        engine_trace!(SOURCE, "Frame {} acquired (slot {})", frame_index, self.semaphore_index);

        let frame = &mut self.frames[frame_index];
        Ok(FrameHandle {
            recorder: &mut frame.recorder,
            render_target: &frame.render_target,
            extent,
            image_index,
            frame_index,
            format,
        })
    }

    /// Prepare the frame of a freshly acquired image for recording
    fn start_frame(&mut self, frame_index: usize) -> Result<()> {
        if frame_index >= self.frames.len() {
            return Err(Error::InvalidResource(format!(
                "acquired image {} but only {} frames exist",
                frame_index,
                self.frames.len()
            )));
        }
        self.frame_index = frame_index;

        self.device.wait_for_fence(&self.frames[frame_index].fence, self.config.fence_timeout)?;
        self.slot_fences[self.semaphore_index] = Some(frame_index);

        let frame = &mut self.frames[frame_index];
        let semaphores = &self.semaphores[self.semaphore_index];
        self.device.attach_acquired_image(&mut frame.render_target, &semaphores.image_acquired)?;
        frame.recorder.begin()
    }

    /// Mark the current acquisition as lost
    ///
    /// The slot's semaphores may still be signaled (or hold the surface
    /// texture), so the next `begin_frame` rebuilds before acquiring again.
    fn abandon_acquisition(&mut self, error: &Error) {
        engine_warn!(
            SOURCE,
            "Frame {} (slot {}) abandoned after acquire: {}",
            self.frame_index,
            self.semaphore_index,
            error
        );
        self.stale_acquisition = true;
    }

    /// Wait until the current slot's semaphores are free, then acquire with them
    fn acquire(&mut self) -> Result<AcquireResult> {
        if let Some(frame) = self.slot_fences[self.semaphore_index] {
            self.device.wait_for_fence(&self.frames[frame].fence, self.config.fence_timeout)?;
        }
        self.stats.acquires += 1;

        let swapchain = self.swapchain.as_mut().ok_or(Error::SwapchainOutOfDate)?;
        swapchain.acquire_next_image(&self.semaphores[self.semaphore_index].image_acquired)
    }

    /// End recording, submit the frame and present it
    ///
    /// Suboptimal/out-of-date presentation triggers a surface check. Any error
    /// leaves the context `Idle` and is propagated.
    pub fn submit_frame(&mut self) -> Result<()> {
        if self.state != FrameState::FrameAcquired {
            return Err(Error::InvalidState(format!("submit_frame called in state {:?}", self.state)));
        }

        let result = self.submit_and_present();
        self.state = FrameState::Idle;

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                self.abandon_acquisition(&e);
                return Err(e);
            }
        };
        match status {
            PresentStatus::Success => {
                self.advance_semaphore_slot();
            }
            status => {
                engine_debug!(SOURCE, "Present returned {:?}, checking surface", status);
                self.surface_dirty = true;
                // A rebuild has already reset the indices
                if !self.handle_surface_changes()? {
                    self.advance_semaphore_slot();
                }
            }
        }
        Ok(())
    }

    fn submit_and_present(&mut self) -> Result<PresentStatus> {
        let frame = &mut self.frames[self.frame_index];
        let semaphores = &self.semaphores[self.semaphore_index];

        frame.recorder.end()?;
        self.state = FrameState::FrameRecorded;

        self.device.reset_fence(&frame.fence)?;
        if let Err(e) = self.device.submit(
            &mut frame.recorder,
            &semaphores.image_acquired,
            &semaphores.render_complete,
            &frame.fence,
        ) {
            engine_error!(SOURCE, "Submit of frame {} failed: {}", self.frame_index, e);
            // The reset fence would never signal; replace it so later waits don't hang
            match self.device.create_fence(true) {
                Ok(fence) => frame.fence = fence,
                Err(fence_error) => engine_error!(
                    SOURCE,
                    "Replacement fence for frame {} failed: {}",
                    self.frame_index,
                    fence_error
                ),
            }
            return Err(e);
        }
        self.stats.frames_submitted += 1;

        let swapchain = self.swapchain.as_mut().ok_or(Error::SwapchainOutOfDate)?;
        swapchain.present(self.frame_index as u32, &semaphores.render_complete)
    }

    fn advance_semaphore_slot(&mut self) {
        self.semaphore_index = (self.semaphore_index + 1) % self.semaphores.len().max(1);
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frame object index of the last acquired image
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Semaphore slot used by the next acquisition
    pub fn semaphore_index(&self) -> usize {
        self.semaphore_index
    }

    pub fn semaphore_slot_count(&self) -> usize {
        self.semaphores.len()
    }

    /// Number of swapchain images (0 while the build is deferred)
    pub fn image_count(&self) -> usize {
        self.swapchain.as_ref().map_or(0, |s| s.image_count())
    }

    /// Number of frame objects
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Extent of the current swapchain
    pub fn extent(&self) -> Extent2D {
        self.swapchain.as_ref().map_or(Extent2D::default(), |s| s.extent())
    }

    /// Color format of the current swapchain
    pub fn format(&self) -> Option<TextureFormat> {
        self.swapchain.as_ref().map(|s| s.format())
    }

    /// Number of swapchain builds so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn attachments(&self) -> AttachmentFlags {
        self.attachments
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn window(&self) -> &Arc<dyn Window> {
        &self.window
    }

    pub fn surface(&self) -> &D::Surface {
        &self.surface
    }

    pub fn swapchain(&self) -> Option<&D::Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn frames(&self) -> &[FrameObjects<D>] {
        &self.frames
    }

    pub fn semaphores(&self) -> &[FrameSemaphores<D>] {
        &self.semaphores
    }

    /// Frame guarding each semaphore slot
    pub fn slot_fences(&self) -> &[Option<usize>] {
        &self.slot_fences
    }

    /// Whether an abandoned acquisition forces a rebuild on the next frame
    pub fn has_stale_acquisition(&self) -> bool {
        self.stale_acquisition
    }
}

impl<D: GraphicsDevice> Drop for RenderingContext<D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            engine_error!(SOURCE, "wait_idle failed while destroying context {}: {}", self.id.0, e);
        }
    }
}

#[cfg(test)]
#[path = "rendering_context_tests.rs"]
mod tests;

/// Mock graphics device for unit tests (no GPU required)
///
/// Every call is appended to a shared event log so tests can check the order
/// of fence waits, recorder resets, submissions and presents. Acquire and
/// present results can be scripted, and a "slow GPU" mode leaves submitted
/// fences pending until a CPU wait observes them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    choose_image_count, choose_present_mode, choose_surface_format, resolve_extent,
    AcquireResult, AttachmentFlags, BackendKind, BufferDesc, ColorSpace, CommandRecorder,
    Extent2D, GraphicsDevice, IndexType, PipelineDesc, PresentMode, PresentStatus, Rect2D,
    SurfaceCapabilities, SurfaceFormat, Swapchain, SwapchainDesc, TextureDesc, TextureFormat,
    Viewport, Window,
};

// ============================================================================
// Event log
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateSurface { surface: u32 },
    CreateSwapchain { swapchain: u32, extent: Extent2D, image_count: usize, old: Option<u32> },
    DestroySwapchain { swapchain: u32 },
    Acquire { swapchain: u32, semaphore: u32 },
    Present { swapchain: u32, image_index: u32, semaphore: u32 },
    WaitFence { fence: u32 },
    FenceSignaled { fence: u32 },
    ResetFence { fence: u32 },
    RecorderBegin { recorder: u32 },
    RecorderEnd { recorder: u32 },
    Submit { recorder: u32, wait: u32, signal: u32, fence: u32 },
    AttachImage { semaphore: u32 },
    WaitIdle,
    BeginRenderPass { clear: bool, extent: Extent2D },
    EndRenderPass,
    BindPipeline { pipeline: u32 },
    BindVertexBuffer { buffer: u32 },
    BindIndexBuffer { buffer: u32, index_type: IndexType },
    BindTexture { texture: u32 },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    PushConstants(Vec<u8>),
    DrawIndexed { index_count: u32, first_index: u32, vertex_offset: i32 },
    CreateBuffer { buffer: u32, size: u64 },
    WriteBuffer { buffer: u32, offset: u64, len: usize },
    CreateTexture { texture: u32, width: u32, height: u32 },
    CreatePipeline { pipeline: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    /// Submitted, not yet observed by a CPU wait
    Pending,
    /// Reset and never submitted
    Unsignaled,
}

struct MockState {
    next_id: u32,
    events: Vec<MockEvent>,
    image_count: usize,
    slot_count: Option<usize>,
    surface_extent: Option<Extent2D>,
    depth_format: Option<TextureFormat>,
    slow_gpu: bool,
    hung_gpu: bool,
    fail_swapchain_creation: bool,
    fail_next_submit: bool,
    fail_fence_creation: bool,
    acquire_script: VecDeque<AcquireResult>,
    present_script: VecDeque<PresentStatus>,
    fences: FxHashMap<u32, FenceState>,
}

impl MockState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn push(&mut self, event: MockEvent) {
        self.events.push(event);
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap()
}

// ============================================================================
// Mock Window
// ============================================================================

/// Window with a settable drawable size and no native handles
pub struct MockWindow {
    size: Mutex<Extent2D>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self { size: Mutex::new(Extent2D::new(width, height)) })
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = Extent2D::new(width, height);
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl Window for MockWindow {
    fn drawable_size(&self) -> Extent2D {
        *self.size.lock().unwrap()
    }
}

// ============================================================================
// Mock objects
// ============================================================================

pub struct MockSurface {
    pub id: u32,
    window: Arc<dyn Window>,
}

pub struct MockSwapchain {
    pub id: u32,
    extent: Extent2D,
    requested_extent: Extent2D,
    image_count: usize,
    next_image: u32,
    surface_format: SurfaceFormat,
    present_mode: PresentMode,
    state: SharedState,
}

impl Swapchain for MockSwapchain {
    type Semaphore = MockSemaphore;

    fn acquire_next_image(&mut self, image_acquired: &MockSemaphore) -> Result<AcquireResult> {
        let mut state = lock(&self.state);
        state.push(MockEvent::Acquire { swapchain: self.id, semaphore: image_acquired.id });
        match state.acquire_script.pop_front() {
            Some(result) => Ok(result),
            None => {
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count as u32;
                Ok(AcquireResult::Acquired(index))
            }
        }
    }

    fn present(&mut self, image_index: u32, render_complete: &MockSemaphore) -> Result<PresentStatus> {
        let mut state = lock(&self.state);
        state.push(MockEvent::Present {
            swapchain: self.id,
            image_index,
            semaphore: render_complete.id,
        });
        Ok(state.present_script.pop_front().unwrap_or(PresentStatus::Success))
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn requested_extent(&self) -> Extent2D {
        self.requested_extent
    }

    fn format(&self) -> TextureFormat {
        self.surface_format.format
    }

    fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.push(MockEvent::DestroySwapchain { swapchain: self.id });
    }
}

#[derive(Debug)]
pub struct MockImageView {
    pub swapchain: u32,
    pub image_index: u32,
}

#[derive(Debug)]
pub struct MockRenderTarget {
    pub extent: Extent2D,
    pub image_index: u32,
    pub has_depth: bool,
    /// Semaphore of the last attached acquisition
    pub attached: Option<u32>,
}

#[derive(Debug)]
pub struct MockFence {
    pub id: u32,
}

#[derive(Debug)]
pub struct MockSemaphore {
    pub id: u32,
}

pub struct MockBuffer {
    pub id: u32,
    pub size: u64,
    pub data: Mutex<Vec<u8>>,
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct MockPipeline {
    pub id: u32,
    pub push_constant_size: u32,
}

pub struct MockCommandRecorder {
    pub id: u32,
    recording: bool,
    in_render_pass: bool,
    state: SharedState,
}

impl MockCommandRecorder {
    fn record(&self, event: MockEvent) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState("command recorder is not recording".to_string()));
        }
        lock(&self.state).push(event);
        Ok(())
    }
}

impl CommandRecorder for MockCommandRecorder {
    type RenderTarget = MockRenderTarget;
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type Pipeline = MockPipeline;

    fn begin(&mut self) -> Result<()> {
        self.recording = true;
        self.in_render_pass = false;
        lock(&self.state).push(MockEvent::RecorderBegin { recorder: self.id });
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState("command recorder is not recording".to_string()));
        }
        if self.in_render_pass {
            return Err(Error::InvalidState("render pass still open".to_string()));
        }
        self.recording = false;
        lock(&self.state).push(MockEvent::RecorderEnd { recorder: self.id });
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn begin_render_pass(&mut self, target: &MockRenderTarget, clear_color: Option<[f32; 4]>) -> Result<()> {
        self.record(MockEvent::BeginRenderPass { clear: clear_color.is_some(), extent: target.extent })?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record(MockEvent::EndRenderPass)?;
        self.in_render_pass = false;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &MockPipeline) -> Result<()> {
        self.record(MockEvent::BindPipeline { pipeline: pipeline.id })
    }

    fn bind_vertex_buffer(&mut self, buffer: &MockBuffer, _offset: u64) -> Result<()> {
        self.record(MockEvent::BindVertexBuffer { buffer: buffer.id })
    }

    fn bind_index_buffer(&mut self, buffer: &MockBuffer, _offset: u64, index_type: IndexType) -> Result<()> {
        self.record(MockEvent::BindIndexBuffer { buffer: buffer.id, index_type })
    }

    fn bind_texture(&mut self, _pipeline: &MockPipeline, texture: &MockTexture) -> Result<()> {
        self.record(MockEvent::BindTexture { texture: texture.id })
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(MockEvent::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.record(MockEvent::SetScissor(scissor))
    }

    fn push_constants(&mut self, pipeline: &MockPipeline, data: &[u8]) -> Result<()> {
        if data.len() as u32 > pipeline.push_constant_size {
            return Err(Error::InvalidResource("push constants exceed pipeline range".to_string()));
        }
        self.record(MockEvent::PushConstants(data.to_vec()))
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.record(MockEvent::DrawIndexed { index_count, first_index, vertex_offset })
    }
}

// ============================================================================
// Mock Device
// ============================================================================

/// GPU-free device with a shared event log
#[derive(Clone)]
pub struct MockDevice {
    state: SharedState,
}

impl MockDevice {
    /// Device whose swapchains have two images
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 0,
                events: Vec::new(),
                image_count: 2,
                slot_count: None,
                surface_extent: None,
                depth_format: Some(TextureFormat::D32_FLOAT),
                slow_gpu: false,
                hung_gpu: false,
                fail_swapchain_creation: false,
                fail_next_submit: false,
                fail_fence_creation: false,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fences: FxHashMap::default(),
            })),
        }
    }

    /// Number of images for swapchains created from now on
    pub fn set_image_count(&self, count: usize) {
        lock(&self.state).image_count = count;
    }

    /// Override the semaphore slot count (defaults to the image count)
    pub fn set_slot_count(&self, count: Option<usize>) {
        lock(&self.state).slot_count = count;
    }

    /// Report a fixed surface extent instead of deferring to the window
    pub fn set_surface_extent(&self, extent: Option<Extent2D>) {
        lock(&self.state).surface_extent = extent;
    }

    pub fn set_depth_format(&self, format: Option<TextureFormat>) {
        lock(&self.state).depth_format = format;
    }

    /// Leave submitted fences pending until a CPU wait observes them
    pub fn set_slow_gpu(&self, slow: bool) {
        lock(&self.state).slow_gpu = slow;
    }

    /// Never complete submitted work (fence waits time out)
    pub fn set_hung_gpu(&self, hung: bool) {
        lock(&self.state).hung_gpu = hung;
    }

    pub fn set_fail_swapchain_creation(&self, fail: bool) {
        lock(&self.state).fail_swapchain_creation = fail;
    }

    pub fn fail_next_submit(&self) {
        lock(&self.state).fail_next_submit = true;
    }

    pub fn set_fail_fence_creation(&self, fail: bool) {
        lock(&self.state).fail_fence_creation = fail;
    }

    /// Queue results returned by the next acquisitions (any swapchain)
    pub fn script_acquire(&self, results: impl IntoIterator<Item = AcquireResult>) {
        lock(&self.state).acquire_script.extend(results);
    }

    /// Queue results returned by the next presents (any swapchain)
    pub fn script_present(&self, results: impl IntoIterator<Item = PresentStatus>) {
        lock(&self.state).present_script.extend(results);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.state).events.clone()
    }

    pub fn clear_events(&self) {
        lock(&self.state).events.clear();
    }

    /// Number of logged events matching a predicate
    pub fn count(&self, predicate: impl Fn(&MockEvent) -> bool) -> usize {
        lock(&self.state).events.iter().filter(|e| predicate(e)).count()
    }
}

impl GraphicsDevice for MockDevice {
    type Surface = MockSurface;
    type Swapchain = MockSwapchain;
    type ImageView = MockImageView;
    type RenderTarget = MockRenderTarget;
    type CommandRecorder = MockCommandRecorder;
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type Pipeline = MockPipeline;

    fn backend(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn create_surface(&self, window: &Arc<dyn Window>) -> Result<MockSurface> {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.push(MockEvent::CreateSurface { surface: id });
        Ok(MockSurface { id, window: window.clone() })
    }

    fn surface_capabilities(&self, surface: &MockSurface) -> Result<SurfaceCapabilities> {
        let state = lock(&self.state);
        let image_count = state.image_count as u32;
        // Minimized windows report a zero current extent, like real surfaces
        let current_extent = state.surface_extent.or_else(|| {
            let size = surface.window.drawable_size();
            size.is_empty().then_some(Extent2D::new(0, 0))
        });
        Ok(SurfaceCapabilities {
            current_extent,
            min_extent: Extent2D::new(1, 1),
            max_extent: Extent2D::new(16384, 16384),
            min_image_count: image_count.saturating_sub(1).max(1),
            max_image_count: image_count,
            formats: vec![SurfaceFormat::new(TextureFormat::B8G8R8A8_UNORM, ColorSpace::SrgbNonlinear)],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
        })
    }

    fn create_swapchain(
        &self,
        surface: &MockSurface,
        desc: &SwapchainDesc,
        old: Option<&MockSwapchain>,
    ) -> Result<MockSwapchain> {
        let caps = self.surface_capabilities(surface)?;
        let mut state = lock(&self.state);
        if state.fail_swapchain_creation {
            return Err(Error::BackendError("mock swapchain creation failed".to_string()));
        }
        let surface_format = choose_surface_format(&caps.formats, &desc.preferred_formats)
            .ok_or_else(|| Error::InitializationFailed("no surface format".to_string()))?;
        let present_mode = choose_present_mode(&caps.present_modes, &desc.present_modes);
        let extent = resolve_extent(&caps, desc.requested_extent);
        let image_count = choose_image_count(&caps, desc.min_image_count) as usize;

        let id = state.next_id();
        state.push(MockEvent::CreateSwapchain {
            swapchain: id,
            extent,
            image_count,
            old: old.map(|o| o.id),
        });
        Ok(MockSwapchain {
            id,
            extent,
            requested_extent: desc.requested_extent,
            image_count,
            next_image: 0,
            surface_format,
            present_mode,
            state: self.state.clone(),
        })
    }

    fn create_image_view(&self, swapchain: &MockSwapchain, image_index: u32) -> Result<MockImageView> {
        Ok(MockImageView { swapchain: swapchain.id, image_index })
    }

    fn create_render_target(
        &self,
        swapchain: &MockSwapchain,
        view: &MockImageView,
        attachments: AttachmentFlags,
    ) -> Result<MockRenderTarget> {
        let has_depth = attachments.contains(AttachmentFlags::DEPTH) && self.depth_format().is_some();
        Ok(MockRenderTarget {
            extent: swapchain.extent,
            image_index: view.image_index,
            has_depth,
            attached: None,
        })
    }

    fn create_command_recorder(&self) -> Result<MockCommandRecorder> {
        let id = lock(&self.state).next_id();
        Ok(MockCommandRecorder {
            id,
            recording: false,
            in_render_pass: false,
            state: self.state.clone(),
        })
    }

    fn create_fence(&self, signaled: bool) -> Result<MockFence> {
        let mut state = lock(&self.state);
        if state.fail_fence_creation {
            return Err(Error::OutOfMemory);
        }
        let id = state.next_id();
        let fence_state = if signaled { FenceState::Signaled } else { FenceState::Unsignaled };
        state.fences.insert(id, fence_state);
        Ok(MockFence { id })
    }

    fn create_semaphore(&self) -> Result<MockSemaphore> {
        Ok(MockSemaphore { id: lock(&self.state).next_id() })
    }

    fn semaphore_slot_count(&self, image_count: usize) -> usize {
        lock(&self.state).slot_count.unwrap_or(image_count)
    }

    fn attach_acquired_image(&self, target: &mut MockRenderTarget, image_acquired: &MockSemaphore) -> Result<()> {
        target.attached = Some(image_acquired.id);
        lock(&self.state).push(MockEvent::AttachImage { semaphore: image_acquired.id });
        Ok(())
    }

    fn wait_for_fence(&self, fence: &MockFence, _timeout: Duration) -> Result<()> {
        let mut state = lock(&self.state);
        state.push(MockEvent::WaitFence { fence: fence.id });
        match state.fences.get(&fence.id).copied() {
            Some(FenceState::Signaled) => Ok(()),
            Some(FenceState::Pending) if !state.hung_gpu => {
                state.fences.insert(fence.id, FenceState::Signaled);
                state.push(MockEvent::FenceSignaled { fence: fence.id });
                Ok(())
            }
            Some(_) => Err(Error::Timeout(format!("fence {} not signaled", fence.id))),
            None => Err(Error::InvalidResource(format!("unknown fence {}", fence.id))),
        }
    }

    fn reset_fence(&self, fence: &MockFence) -> Result<()> {
        let mut state = lock(&self.state);
        state.fences.insert(fence.id, FenceState::Unsignaled);
        state.push(MockEvent::ResetFence { fence: fence.id });
        Ok(())
    }

    fn submit(
        &self,
        recorder: &mut MockCommandRecorder,
        wait: &MockSemaphore,
        signal: &MockSemaphore,
        fence: &MockFence,
    ) -> Result<()> {
        if recorder.recording {
            return Err(Error::InvalidState("submitting a recorder that is still recording".to_string()));
        }
        let mut state = lock(&self.state);
        if state.fail_next_submit {
            state.fail_next_submit = false;
            return Err(Error::DeviceLost);
        }
        state.push(MockEvent::Submit {
            recorder: recorder.id,
            wait: wait.id,
            signal: signal.id,
            fence: fence.id,
        });
        if state.slow_gpu || state.hung_gpu {
            state.fences.insert(fence.id, FenceState::Pending);
        } else {
            state.fences.insert(fence.id, FenceState::Signaled);
            state.push(MockEvent::FenceSignaled { fence: fence.id });
        }
        Ok(())
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        lock(&self.state).depth_format
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = lock(&self.state);
        state.push(MockEvent::WaitIdle);
        if !state.hung_gpu {
            let pending: Vec<u32> = state
                .fences
                .iter()
                .filter(|(_, s)| **s == FenceState::Pending)
                .map(|(id, _)| *id)
                .collect();
            for id in pending {
                state.fences.insert(id, FenceState::Signaled);
                state.push(MockEvent::FenceSignaled { fence: id });
            }
        }
        Ok(())
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<MockBuffer> {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.push(MockEvent::CreateBuffer { buffer: id, size: desc.size });
        Ok(MockBuffer { id, size: desc.size, data: Mutex::new(vec![0; desc.size as usize]) })
    }

    fn write_buffer(&self, buffer: &MockBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > buffer.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(), offset, buffer.size
            )));
        }
        buffer.data.lock().unwrap()[offset as usize..end as usize].copy_from_slice(data);
        lock(&self.state).push(MockEvent::WriteBuffer { buffer: buffer.id, offset, len: data.len() });
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDesc, data: &[u8]) -> Result<MockTexture> {
        if data.len() as u64 != desc.data_size() {
            return Err(Error::InvalidResource("texture data size mismatch".to_string()));
        }
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.push(MockEvent::CreateTexture { texture: id, width: desc.width, height: desc.height });
        Ok(MockTexture { id, width: desc.width, height: desc.height })
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<MockPipeline> {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.push(MockEvent::CreatePipeline { pipeline: id });
        Ok(MockPipeline { id, push_constant_size: desc.push_constant_size })
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;

/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use lumen_engine::lumen::render::{
    AttachmentFlags, BackendKind, BufferDesc, PipelineDesc, SurfaceCapabilities, SwapchainDesc,
    TextureDesc, TextureFormat, Window, Swapchain as RendererSwapchain,
    CommandRecorder as RendererCommandRecorder,
};
use lumen_engine::lumen::{Config, Error, GraphicsDevice, Result};
use lumen_engine::{engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_recorder::CommandRecorder;
use crate::vulkan_context::{map_vk_error, GpuContext, GpuContextDesc, SOURCE};
use crate::vulkan_format::texture_format_to_vk;
use crate::vulkan_frame::{Fence, ImageView, RenderTarget, Semaphore};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_surface::Surface;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::{
    create_linear_sampler, create_texture_descriptor_pool, create_texture_set_layout, Texture,
};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Depth formats probed in order of preference
pub(crate) const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_FLOAT,
    TextureFormat::D32_FLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// First candidate depth format the device can attach
pub(crate) fn pick_depth_format<F>(supports_attachment: F) -> Option<TextureFormat>
where
    F: Fn(vk::Format) -> bool,
{
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|format| supports_attachment(texture_format_to_vk(*format)))
}

/// Pick (graphics, present) queue families
///
/// Prefers a single family doing both; otherwise the first graphics family
/// and the first family able to present.
pub(crate) fn pick_queue_families<F>(families: &[vk::QueueFamilyProperties], can_present: F) -> Option<(u32, u32)>
where
    F: Fn(u32) -> bool,
{
    let is_graphics = |i: usize| families[i].queue_flags.contains(vk::QueueFlags::GRAPHICS);

    if let Some(both) = (0..families.len()).find(|&i| is_graphics(i) && can_present(i as u32)) {
        return Some((both as u32, both as u32));
    }

    let graphics = (0..families.len()).find(|&i| is_graphics(i))?;
    let present = (0..families.len() as u32).find(|&i| can_present(i))?;
    Some((graphics as u32, present))
}

/// Vulkan graphics device
///
/// Cheap to share: every object it creates holds the same `Arc<GpuContext>`.
pub struct VulkanDevice {
    ctx: Arc<GpuContext>,
    depth_format: Option<TextureFormat>,
    device_name: String,
}

impl VulkanDevice {
    /// Create the Vulkan device
    ///
    /// The window is only used to pick a queue family able to present; each
    /// rendering context creates its own surface afterwards.
    ///
    /// # Arguments
    ///
    /// * `window` - Any window of the platform display
    /// * `config` - Engine configuration (application info, validation)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|_| {
                engine_error!(SOURCE, "Application name contains a NUL byte");
                Error::InitializationFailed("Application name contains a NUL byte".to_string())
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Lumen")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!(SOURCE, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            // Validation is best effort: a missing layer only disables it
            let enable_validation = config.enable_validation && {
                let available = entry.enumerate_instance_layer_properties().unwrap_or_default();
                let found = available
                    .iter()
                    .any(|layer| layer.layer_name_as_c_str().map(|n| n == VALIDATION_LAYER).unwrap_or(false));
                if !found {
                    engine_warn!(SOURCE, "Validation requested but {:?} is not installed, continuing without it",
                        VALIDATION_LAYER);
                }
                found
            };

            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if enable_validation { vec![VALIDATION_LAYER.as_ptr()] } else { vec![] };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config(config.debug_severity);

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        engine_warn!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        crate::debug::cleanup_debug_config();
                        (None, None)
                    }
                }
            } else {
                (None, None)
            };

            // Instance-level objects are released through `partial` on failure from here on
            let partial = PartialInit { instance: &instance, debug_utils: &debug_utils_loader, messenger: debug_messenger };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Temporary surface for queue selection
            let window_handle = window.window_handle().map_err(|e| {
                partial.destroy();
                engine_error!(SOURCE, "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let probe_surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                partial.destroy();
                engine_error!(SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let physical_devices = instance.enumerate_physical_devices().unwrap_or_default();
            let selected = physical_devices.into_iter().find_map(|physical_device| {
                let families = instance.get_physical_device_queue_family_properties(physical_device);
                pick_queue_families(&families, |i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, probe_surface)
                        .unwrap_or(false)
                })
                .map(|(graphics, present)| (physical_device, graphics, present))
            });
            surface_loader.destroy_surface(probe_surface, None);

            let (physical_device, graphics_family_index, present_family_index) = selected.ok_or_else(|| {
                partial.destroy();
                engine_error!(SOURCE, "No Vulkan GPU can render and present to this window");
                Error::InitializationFailed("No Vulkan GPU can render and present to this window".to_string())
            })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());

            let depth_format = pick_depth_format(|format| {
                instance
                    .get_physical_device_format_properties(physical_device, format)
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            });

            // Logical device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];
            if present_family_index != graphics_family_index {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    partial.destroy();
                    engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let shared = Self::create_shared_objects(&instance, &device, physical_device, graphics_family_index);
            let (allocator, upload_command_pool, texture_set_layout, descriptor_pool, sampler) = match shared {
                Ok(shared) => shared,
                Err(e) => {
                    device.destroy_device(None);
                    partial.destroy();
                    return Err(e);
                }
            };

            let ctx = Arc::new(GpuContext::new(GpuContextDesc {
                entry,
                instance,
                surface_loader,
                physical_device,
                device,
                allocator,
                graphics_queue_family: graphics_family_index,
                present_queue_family: present_family_index,
                upload_command_pool,
                texture_set_layout,
                descriptor_pool,
                sampler,
                debug_utils_loader,
                debug_messenger,
            }));

            engine_info!(SOURCE, "Vulkan device ready: {} (graphics family {}, present family {}, depth {:?}, validation {})",
                device_name, graphics_family_index, present_family_index, depth_format, enable_validation);

            Ok(Self { ctx, depth_format, device_name })
        }
    }

    /// Allocator, upload pool and texture binding objects
    ///
    /// Destroys whatever it created when a later step fails.
    unsafe fn create_shared_objects(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        graphics_family_index: u32,
    ) -> Result<(Allocator, vk::CommandPool, vk::DescriptorSetLayout, vk::DescriptorPool, vk::Sampler)> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let upload_command_pool = device
            .create_command_pool(&upload_pool_create_info, None)
            .map_err(|e| map_vk_error("create upload command pool", e))?;

        let texture_set_layout = match create_texture_set_layout(device) {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_command_pool(upload_command_pool, None);
                return Err(e);
            }
        };
        let descriptor_pool = match create_texture_descriptor_pool(device) {
            Ok(pool) => pool,
            Err(e) => {
                device.destroy_descriptor_set_layout(texture_set_layout, None);
                device.destroy_command_pool(upload_command_pool, None);
                return Err(e);
            }
        };
        let sampler = match create_linear_sampler(device) {
            Ok(sampler) => sampler,
            Err(e) => {
                device.destroy_descriptor_pool(descriptor_pool, None);
                device.destroy_descriptor_set_layout(texture_set_layout, None);
                device.destroy_command_pool(upload_command_pool, None);
                return Err(e);
            }
        };

        Ok((allocator, upload_command_pool, texture_set_layout, descriptor_pool, sampler))
    }

    /// Name of the selected physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Instance-level objects to release when device creation fails midway
struct PartialInit<'a> {
    instance: &'a ash::Instance,
    debug_utils: &'a Option<ash::ext::debug_utils::Instance>,
    messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl PartialInit<'_> {
    unsafe fn destroy(&self) {
        crate::debug::cleanup_debug_config();
        if let (Some(debug_utils), Some(messenger)) = (self.debug_utils, self.messenger) {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}

impl GraphicsDevice for VulkanDevice {
    type Surface = Surface;
    type Swapchain = Swapchain;
    type ImageView = ImageView;
    type RenderTarget = RenderTarget;
    type CommandRecorder = CommandRecorder;
    type Fence = Fence;
    type Semaphore = Semaphore;
    type Buffer = Buffer;
    type Texture = Texture;
    type Pipeline = Pipeline;

    fn backend(&self) -> BackendKind {
        BackendKind::Vulkan
    }

    fn create_surface(&self, window: &Arc<dyn Window>) -> Result<Surface> {
        Surface::new(Arc::clone(&self.ctx), window)
    }

    fn surface_capabilities(&self, surface: &Surface) -> Result<SurfaceCapabilities> {
        surface.capabilities()
    }

    fn create_swapchain(
        &self,
        surface: &Surface,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<Swapchain> {
        Swapchain::new(Arc::clone(&self.ctx), surface, desc, old)
    }

    fn create_image_view(&self, swapchain: &Swapchain, image_index: u32) -> Result<ImageView> {
        ImageView::new(Arc::clone(&self.ctx), swapchain.image(image_index)?, swapchain.vk_format)
    }

    fn create_render_target(
        &self,
        swapchain: &Swapchain,
        view: &ImageView,
        attachments: AttachmentFlags,
    ) -> Result<RenderTarget> {
        let depth_format = if attachments.contains(AttachmentFlags::DEPTH) {
            if self.depth_format.is_none() {
                engine_warn!(SOURCE, "Depth attachment requested but the device has no depth format");
            }
            self.depth_format
        } else {
            None
        };
        RenderTarget::new(Arc::clone(&self.ctx), view, swapchain.vk_format, depth_format, swapchain.extent())
    }

    fn create_command_recorder(&self) -> Result<CommandRecorder> {
        CommandRecorder::new(Arc::clone(&self.ctx))
    }

    fn create_fence(&self, signaled: bool) -> Result<Fence> {
        Fence::new(Arc::clone(&self.ctx), signaled)
    }

    fn create_semaphore(&self) -> Result<Semaphore> {
        Semaphore::new(Arc::clone(&self.ctx))
    }

    fn semaphore_slot_count(&self, image_count: usize) -> usize {
        image_count
    }

    fn wait_for_fence(&self, fence: &Fence, timeout: Duration) -> Result<()> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        let result = unsafe { self.ctx.device.wait_for_fences(&[fence.fence], true, timeout_ns) };
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => {
                engine_warn!(SOURCE, "Fence not signaled after {:?}", timeout);
                Err(Error::Timeout(format!("fence not signaled after {:?}", timeout)))
            }
            Err(e) => Err(map_vk_error("wait for fence", e)),
        }
    }

    fn reset_fence(&self, fence: &Fence) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[fence.fence])
                .map_err(|e| map_vk_error("reset fence", e))
        }
    }

    fn submit(
        &self,
        recorder: &mut CommandRecorder,
        wait: &Semaphore,
        signal: &Semaphore,
        fence: &Fence,
    ) -> Result<()> {
        if recorder.is_recording() {
            engine_error!(SOURCE, "submit called before the recorder was ended");
            return Err(Error::InvalidState("command recorder is still recording".to_string()));
        }

        let wait_semaphores = [wait.semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [recorder.command_buffer];
        let signal_semaphores = [signal.semaphore];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _queue = self.ctx.queue_guard()?;
        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence.fence)
                .map_err(|e| map_vk_error("submit command buffer", e))
        }
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }

    fn wait_idle(&self) -> Result<()> {
        let _queue = self.ctx.queue_guard()?;
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| map_vk_error("wait for device idle", e))
        }
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Buffer> {
        Buffer::new(Arc::clone(&self.ctx), desc)
    }

    fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<()> {
        buffer.write(offset, data)
    }

    fn create_texture(&self, desc: &TextureDesc, data: &[u8]) -> Result<Texture> {
        Texture::new(Arc::clone(&self.ctx), desc, data)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline> {
        Pipeline::new(Arc::clone(&self.ctx), desc)
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;

/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Instance, device and loaders
/// - Allocator for memory management
/// - Queues for submission and presentation
/// - Command pool for one-shot upload operations
/// - Render pass cache, texture descriptor pools and the UI sampler

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_err, engine_error};
use rustc_hash::FxHashMap;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

use crate::vulkan_render_pass::RenderPassKey;

pub(crate) const SOURCE: &str = "lumen::vulkan";

/// Shared GPU context for all Vulkan resources.
///
/// Every resource (surface, swapchain, frame objects, buffers, textures,
/// pipelines) holds an `Arc<GpuContext>`, so the context is dropped last and
/// destroys the device and instance once nothing references them anymore.
pub struct GpuContext {
    /// Vulkan library entry (must outlive the instance)
    pub(crate) _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue for command submission
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    /// Present queue (may be the graphics queue)
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,
    /// Serializes queue submission and presentation
    queue_lock: Mutex<()>,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    /// Render passes by attachment formats and load behavior
    pub(crate) render_passes: Mutex<FxHashMap<RenderPassKey, vk::RenderPass>>,

    /// Layout of the single combined image/sampler set used by sampled pipelines
    pub(crate) texture_set_layout: vk::DescriptorSetLayout,
    /// Descriptor pools for texture sets (grows when exhausted)
    pub(crate) descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,
    /// Linear clamp-to-edge sampler shared by every texture
    pub(crate) sampler: vk::Sampler,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

/// Vulkan handles gathered during device initialization
pub(crate) struct GpuContextDesc {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub allocator: Allocator,
    pub graphics_queue_family: u32,
    pub present_queue_family: u32,
    pub upload_command_pool: vk::CommandPool,
    pub texture_set_layout: vk::DescriptorSetLayout,
    pub descriptor_pool: vk::DescriptorPool,
    pub sampler: vk::Sampler,
    pub debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    pub(crate) fn new(desc: GpuContextDesc) -> Self {
        unsafe {
            let graphics_queue = desc.device.get_device_queue(desc.graphics_queue_family, 0);
            let present_queue = desc.device.get_device_queue(desc.present_queue_family, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&desc.instance, &desc.device);

            Self {
                _entry: desc.entry,
                instance: desc.instance,
                surface_loader: desc.surface_loader,
                physical_device: desc.physical_device,
                device: desc.device,
                swapchain_loader,
                allocator: ManuallyDrop::new(Mutex::new(desc.allocator)),
                graphics_queue,
                graphics_queue_family: desc.graphics_queue_family,
                present_queue,
                present_queue_family: desc.present_queue_family,
                queue_lock: Mutex::new(()),
                upload_command_pool: Mutex::new(desc.upload_command_pool),
                render_passes: Mutex::new(FxHashMap::default()),
                texture_set_layout: desc.texture_set_layout,
                descriptor_pools: Mutex::new(vec![desc.descriptor_pool]),
                sampler: desc.sampler,
                debug_utils_loader: desc.debug_utils_loader,
                debug_messenger: desc.debug_messenger,
            }
        }
    }

    /// Lock the allocator
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!(SOURCE, "GPU allocator lock poisoned"))
    }

    /// Lock the queues for submission or presentation
    pub(crate) fn queue_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.queue_lock
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Queue lock poisoned"))
    }

    /// Record and run a one-shot command buffer, blocking until it completes
    pub(crate) fn one_time_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| map_vk_error("allocate upload command buffer", e))?[0];

            let result = (|| {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| map_vk_error("begin upload command buffer", e))?;

                record(command_buffer);

                self.device
                    .end_command_buffer(command_buffer)
                    .map_err(|e| map_vk_error("end upload command buffer", e))?;

                let command_buffers = [command_buffer];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

                let _queue = self.queue_guard()?;
                self.device
                    .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| map_vk_error("submit upload commands", e))?;
                self.device
                    .queue_wait_idle(self.graphics_queue)
                    .map_err(|e| map_vk_error("wait for upload completion", e))
            })();

            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }
}

/// Map a failed Vulkan call to an engine error, logging it
pub(crate) fn map_vk_error(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_DEVICE_LOST => {
            engine_error!(SOURCE, "Device lost during {}", what);
            Error::DeviceLost
        }
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            engine_error!(SOURCE, "Out of memory during {}: {:?}", what, result);
            Error::OutOfMemory
        }
        _ => engine_err!(SOURCE, "Failed to {}: {:?}", what, result),
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Device-level caches and shared objects
            if let Ok(render_passes) = self.render_passes.get_mut() {
                for (_, render_pass) in render_passes.drain() {
                    self.device.destroy_render_pass(render_pass, None);
                }
            }
            if let Ok(pools) = self.descriptor_pools.get_mut() {
                for pool in pools.drain(..) {
                    self.device.destroy_descriptor_pool(pool, None);
                }
            }
            self.device.destroy_descriptor_set_layout(self.texture_set_layout, None);
            self.device.destroy_sampler(self.sampler, None);
            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // 2. Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Stop reporting before the messenger goes away
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        engine_debug!(SOURCE, "GPU context destroyed");
    }
}

/// Per-frame Vulkan objects: fences, semaphores, image views, render targets

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use lumen_engine::lumen::render::{Extent2D, TextureFormat};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::sync::Arc;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::texture_format_to_vk;
use crate::vulkan_render_pass::RenderPassKey;

/// CPU-waitable completion signal
pub struct Fence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl Fence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            ctx.device
                .create_fence(&create_info, None)
                .map_err(|e| map_vk_error("create fence", e))?
        };
        Ok(Self { ctx, fence })
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Binary GPU-GPU semaphore
pub struct Semaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Semaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let semaphore = unsafe {
            ctx.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| map_vk_error("create semaphore", e))?
        };
        Ok(Self { ctx, semaphore })
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// View on one swapchain image (the image itself belongs to the swapchain)
pub struct ImageView {
    ctx: Arc<GpuContext>,
    pub(crate) view: vk::ImageView,
}

impl ImageView {
    pub(crate) fn new(ctx: Arc<GpuContext>, image: vk::Image, format: vk::Format) -> Result<Self> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(color_subresource_range());

        let view = unsafe {
            ctx.device
                .create_image_view(&create_info, None)
                .map_err(|e| map_vk_error("create swapchain image view", e))?
        };
        Ok(Self { ctx, view })
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
        }
    }
}

pub(crate) fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Depth image owned by a render target
struct DepthAttachment {
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
}

impl DepthAttachment {
    fn new(ctx: &GpuContext, format: TextureFormat, extent: Extent2D) -> Result<Self> {
        let vk_format = texture_format_to_vk(format);
        let aspect_mask = if format.has_stencil() {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format)
                .extent(vk::Extent3D { width: extent.width, height: extent.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| map_vk_error("create depth image", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx
                .allocator()?
                .allocate(&AllocationCreateDesc {
                    name: "depth_attachment",
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_e| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for depth attachment ({}x{}, {:.2} MB)",
                        extent.width, extent.height, size_mb);
                    Error::OutOfMemory
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let bound = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset());
            let mut depth = Self { image, view: vk::ImageView::null(), allocation: Some(allocation) };
            if let Err(e) = bound {
                depth.destroy(ctx);
                return Err(map_vk_error("bind depth image memory", e));
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(vk_format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            match ctx.device.create_image_view(&view_create_info, None) {
                Ok(view) => depth.view = view,
                Err(e) => {
                    depth.destroy(ctx);
                    return Err(map_vk_error("create depth image view", e));
                }
            }

            Ok(depth)
        }
    }

    fn destroy(&mut self, ctx: &GpuContext) {
        unsafe {
            if self.view != vk::ImageView::null() {
                ctx.device.destroy_image_view(self.view, None);
                self.view = vk::ImageView::null();
            }
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.image != vk::Image::null() {
                ctx.device.destroy_image(self.image, None);
                self.image = vk::Image::null();
            }
        }
    }
}

/// Framebuffer for one swapchain image, with an optional depth attachment
pub struct RenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    pub(crate) extent: Extent2D,
    /// Pass clearing the color attachment
    pub(crate) clear_pass: vk::RenderPass,
    /// Compatible pass loading the color attachment
    pub(crate) load_pass: vk::RenderPass,
    depth: Option<DepthAttachment>,
}

impl RenderTarget {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        view: &ImageView,
        color: vk::Format,
        depth_format: Option<TextureFormat>,
        extent: Extent2D,
    ) -> Result<Self> {
        let depth_vk = depth_format.map(texture_format_to_vk);
        let clear_pass = ctx.render_pass(RenderPassKey { color, depth: depth_vk, clear: true })?;
        let load_pass = ctx.render_pass(RenderPassKey { color, depth: depth_vk, clear: false })?;

        let mut depth = match depth_format {
            Some(format) => Some(DepthAttachment::new(&ctx, format, extent)?),
            None => None,
        };

        let mut attachments = vec![view.view];
        if let Some(depth) = &depth {
            attachments.push(depth.view);
        }

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(clear_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { ctx.device.create_framebuffer(&framebuffer_info, None) };
        let framebuffer = match framebuffer {
            Ok(framebuffer) => framebuffer,
            Err(e) => {
                if let Some(depth) = depth.as_mut() {
                    depth.destroy(&ctx);
                }
                return Err(map_vk_error("create framebuffer", e));
            }
        };

        Ok(Self { ctx, framebuffer, extent, clear_pass, load_pass, depth })
    }

    /// Whether the target carries a depth attachment
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
        if let Some(mut depth) = self.depth.take() {
            depth.destroy(&self.ctx);
        }
    }
}

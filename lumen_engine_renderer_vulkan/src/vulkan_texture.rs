/// Texture - sampled 2D Vulkan image with its descriptor set
///
/// Every texture owns one combined image/sampler set in the shared texture set
/// layout, so binding a texture is a single descriptor set bind.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use lumen_engine::lumen::render::TextureDesc;
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_err, engine_error, engine_warn};
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::texture_format_to_vk;
use crate::vulkan_frame::color_subresource_range;

/// Descriptor sets per texture pool; a new pool is added when one runs out
pub(crate) const TEXTURE_SETS_PER_POOL: u32 = 64;

/// Create a pool for texture descriptor sets (sets can be freed individually)
pub(crate) fn create_texture_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        descriptor_count: TEXTURE_SETS_PER_POOL,
    }];
    let create_info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(TEXTURE_SETS_PER_POOL)
        .pool_sizes(&pool_sizes);

    unsafe {
        device
            .create_descriptor_pool(&create_info, None)
            .map_err(|e| map_vk_error("create texture descriptor pool", e))
    }
}

/// Layout of a texture set: one combined image/sampler at binding 0
pub(crate) fn create_texture_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
    let bindings = [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT)];
    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    unsafe {
        device
            .create_descriptor_set_layout(&create_info, None)
            .map_err(|e| map_vk_error("create texture set layout", e))
    }
}

/// Linear, clamp-to-edge sampler shared by every texture
pub(crate) fn create_linear_sampler(device: &ash::Device) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .max_lod(0.0);

    unsafe {
        device
            .create_sampler(&create_info, None)
            .map_err(|e| map_vk_error("create sampler", e))
    }
}

impl GpuContext {
    /// Allocate a texture set, adding a pool when every existing one is full
    fn allocate_texture_set(&self) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self
            .descriptor_pools
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Descriptor pool lock poisoned"))?;

        let layouts = [self.texture_set_layout];
        for &pool in pools.iter().rev() {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            match unsafe { self.device.allocate_descriptor_sets(&allocate_info) } {
                Ok(sets) => return Ok((pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => continue,
                Err(e) => return Err(map_vk_error("allocate texture descriptor set", e)),
            }
        }

        let pool = create_texture_descriptor_pool(&self.device)?;
        pools.push(pool);
        engine_debug!(SOURCE, "Texture descriptor pool added ({} pools)", pools.len());

        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe {
            self.device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(|e| map_vk_error("allocate texture descriptor set", e))?
        };
        Ok((pool, sets[0]))
    }
}

/// Vulkan texture
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    pool: vk::DescriptorPool,
    pub(crate) descriptor_set: vk::DescriptorSet,
    width: u32,
    height: u32,
}

/// Check the pixel data matches the texture description
pub(crate) fn validate_texture_desc(desc: &TextureDesc, data_len: usize) -> Result<()> {
    if desc.width == 0 || desc.height == 0 {
        engine_error!(SOURCE, "Texture '{}' has an empty extent ({}x{})", desc.label, desc.width, desc.height);
        return Err(Error::InvalidResource(format!("Texture '{}' has an empty extent", desc.label)));
    }
    if desc.format.is_depth() {
        engine_error!(SOURCE, "Texture '{}' uses depth format {:?}, which cannot be sampled here",
            desc.label, desc.format);
        return Err(Error::InvalidResource(format!("Texture '{}' uses a depth format", desc.label)));
    }
    if data_len as u64 != desc.data_size() {
        engine_error!(SOURCE, "Texture '{}' data is {} bytes, expected {}", desc.label, data_len, desc.data_size());
        return Err(Error::InvalidResource(format!(
            "Texture '{}' data is {} bytes, expected {}",
            desc.label, data_len, desc.data_size()
        )));
    }
    Ok(())
}

impl Texture {
    /// Create a texture and upload its pixels through a staging buffer
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &TextureDesc, data: &[u8]) -> Result<Self> {
        validate_texture_desc(desc, data.len())?;
        let format = texture_format_to_vk(desc.format);

        let mut texture = Self {
            ctx: Arc::clone(&ctx),
            image: vk::Image::null(),
            view: vk::ImageView::null(),
            allocation: None,
            pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            width: desc.width,
            height: desc.height,
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            // From here on, dropping `texture` releases whatever was created
            texture.image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(texture.image);
            let allocation = ctx.allocator()?.allocate(&AllocationCreateDesc {
                name: &desc.label,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|_e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(SOURCE, "Out of GPU memory for texture (size: {}x{}, {:.2} MB)",
                    desc.width, desc.height, size_mb);
                Error::OutOfMemory
            })?;
            let bound = ctx.device.bind_image_memory(texture.image, allocation.memory(), allocation.offset());
            texture.allocation = Some(allocation);
            bound.map_err(|e| map_vk_error("bind texture image memory", e))?;

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(texture.image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(color_subresource_range());
            texture.view = ctx
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture image view: {:?}", e))?;
        }

        texture.upload(desc, data)?;

        let (pool, descriptor_set) = ctx.allocate_texture_set()?;
        texture.pool = pool;
        texture.descriptor_set = descriptor_set;

        let image_info = [vk::DescriptorImageInfo::default()
            .sampler(ctx.sampler)
            .image_view(texture.view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(descriptor_set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe {
            ctx.device.update_descriptor_sets(&[write], &[]);
        }

        engine_debug!(SOURCE, "Texture '{}' created ({}x{}, {:?})", desc.label, desc.width, desc.height, desc.format);
        Ok(texture)
    }

    /// Copy pixels into the image, leaving it ready for sampling
    fn upload(&self, desc: &TextureDesc, data: &[u8]) -> Result<()> {
        let staging = Buffer::staging(Arc::clone(&self.ctx), "texture_staging_buffer", data.len() as u64)?;
        staging.write(0, data)?;

        let device = &self.ctx.device;
        let image = self.image;
        let (width, height) = (desc.width, desc.height);

        self.ctx.one_time_submit(|command_buffer| unsafe {
            // UNDEFINED -> TRANSFER_DST_OPTIMAL
            let barrier_to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width, height, depth: 1 });
            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            // TRANSFER_DST_OPTIMAL -> SHADER_READ_ONLY_OPTIMAL
            let barrier_to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier_to_shader],
            );
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.descriptor_set != vk::DescriptorSet::null() {
                if let Err(e) = self.ctx.device.free_descriptor_sets(self.pool, &[self.descriptor_set]) {
                    engine_warn!(SOURCE, "Failed to free texture descriptor set: {:?}", e);
                }
            }
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.image != vk::Image::null() {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;

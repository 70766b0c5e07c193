/// Texture - sampled 2D WebGPU texture with its bind group

use lumen_engine::lumen::render::{TextureDesc, TextureFormat};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::sync::Arc;

use crate::wgpu_context::{GpuContext, SOURCE};
use crate::wgpu_format::texture_format_to_wgpu;

/// WebGPU texture implementation
pub struct Texture {
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
    /// Group 0 of sampled pipelines: this texture + the shared sampler
    pub(crate) bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// Check the descriptor and the initial pixel data before creating anything
pub(crate) fn validate_texture_desc(desc: &TextureDesc, data_len: usize) -> Result<wgpu::TextureFormat> {
    if desc.width == 0 || desc.height == 0 {
        engine_error!(SOURCE, "Texture '{}' has an empty extent ({}x{})", desc.label, desc.width, desc.height);
        return Err(Error::InvalidResource(format!("Texture '{}' has an empty extent", desc.label)));
    }
    let format = match texture_format_to_wgpu(desc.format) {
        Some(format) if !desc.format.is_depth() => format,
        _ => {
            engine_error!(SOURCE, "Texture '{}' uses {:?}, which cannot be sampled here", desc.label, desc.format);
            return Err(Error::InvalidResource(format!(
                "Texture '{}' uses unsampleable format {:?}",
                desc.label, desc.format
            )));
        }
    };
    if data_len as u64 != desc.data_size() {
        engine_error!(SOURCE, "Texture '{}' data is {} bytes, expected {}", desc.label, data_len, desc.data_size());
        return Err(Error::InvalidResource(format!(
            "Texture '{}' data is {} bytes, expected {}",
            desc.label, data_len, desc.data_size()
        )));
    }
    Ok(format)
}

/// Bytes per texel of a sampleable format
fn texel_size(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::R16G16B16A16_SFLOAT => 8,
        _ => 4,
    }
}

impl Texture {
    /// Create a texture and upload its pixels through the queue
    pub(crate) fn new(ctx: &Arc<GpuContext>, desc: &TextureDesc, data: &[u8]) -> Result<Self> {
        let format = validate_texture_desc(desc, data.len())?;
        let size = wgpu::Extent3d { width: desc.width, height: desc.height, depth_or_array_layers: 1 };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * texel_size(desc.format)),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&desc.label),
            layout: &ctx.texture_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&ctx.sampler) },
            ],
        });

        Ok(Self {
            _texture: texture,
            _view: view,
            bind_group,
            width: desc.width,
            height: desc.height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
#[path = "wgpu_texture_tests.rs"]
mod tests;

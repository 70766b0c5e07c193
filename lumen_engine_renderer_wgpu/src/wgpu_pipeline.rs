/// Pipeline - WebGPU render pipeline built from an engine PipelineDesc
///
/// Bind groups: group 0 is the texture of sampled pipelines. Push constants
/// are emulated by a uniform block in the next group, bound with a dynamic
/// offset into the recorder's constant buffer.

use lumen_engine::lumen::render::{BlendMode, CullMode, PipelineDesc, ShaderSource};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_error};

use crate::wgpu_context::{GpuContext, MAX_PUSH_CONSTANT_SIZE, SOURCE};
use crate::wgpu_format::{texture_format_to_wgpu, vertex_format_to_wgpu};

const VERTEX_ENTRY_POINT: &str = "vs_main";
const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// WebGPU pipeline implementation
pub struct Pipeline {
    pub(crate) pipeline: wgpu::RenderPipeline,
    /// Size of the push constant block in bytes
    pub(crate) push_constant_size: u32,
    /// Bind group index of the push constant block
    pub(crate) push_constant_group: Option<u32>,
    /// Whether group 0 is a texture group
    pub(crate) sampled_texture: bool,
}

pub(crate) fn blend_state(blend: BlendMode) -> Option<wgpu::BlendState> {
    match blend {
        BlendMode::Opaque => None,
        BlendMode::Alpha => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        }),
    }
}

pub(crate) fn cull_mode_to_wgpu(cull_mode: CullMode) -> Option<wgpu::Face> {
    match cull_mode {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

/// Extract WGSL code, rejecting sources this backend cannot consume
pub(crate) fn wgsl_source(desc: &PipelineDesc) -> Result<&str> {
    match &desc.shader {
        ShaderSource::Wgsl(code) if !code.trim().is_empty() => Ok(code),
        ShaderSource::Wgsl(_) => {
            engine_error!(SOURCE, "Pipeline '{}' has empty WGSL code", desc.label);
            Err(Error::InvalidResource(format!("Pipeline '{}' has empty WGSL code", desc.label)))
        }
        ShaderSource::SpirV { .. } => {
            engine_error!(SOURCE, "Pipeline '{}' uses SPIR-V, the WebGPU backend needs WGSL", desc.label);
            Err(Error::InvalidResource(format!("Pipeline '{}' uses SPIR-V, WGSL required", desc.label)))
        }
    }
}

/// Check the push constant block size
pub(crate) fn validate_push_constant_size(label: &str, size: u32) -> Result<()> {
    if size % 4 != 0 || size > MAX_PUSH_CONSTANT_SIZE {
        engine_error!(SOURCE, "Pipeline '{}' push constant size {} is not a multiple of 4 up to {}",
            label, size, MAX_PUSH_CONSTANT_SIZE);
        return Err(Error::InvalidResource(format!(
            "Pipeline '{}' has invalid push constant size {}",
            label, size
        )));
    }
    Ok(())
}

/// Bind group index of the push constant block, if the pipeline has one
pub(crate) fn push_constant_group(sampled_texture: bool, push_constant_size: u32) -> Option<u32> {
    if push_constant_size == 0 {
        return None;
    }
    Some(if sampled_texture { 1 } else { 0 })
}

impl Pipeline {
    pub(crate) fn new(ctx: &GpuContext, desc: &PipelineDesc) -> Result<Self> {
        let code = wgsl_source(desc)?;
        validate_push_constant_size(&desc.label, desc.push_constant_size)?;

        let color_format = texture_format_to_wgpu(desc.color_format).ok_or_else(|| {
            engine_error!(SOURCE, "Pipeline '{}' has no usable color format", desc.label);
            Error::InvalidResource(format!("Pipeline '{}' color format is undefined", desc.label))
        })?;
        let depth_format = match desc.depth_format {
            Some(format) => Some(texture_format_to_wgpu(format).filter(|f| f.is_depth_stencil_format()).ok_or_else(|| {
                engine_error!(SOURCE, "Pipeline '{}' depth format {:?} is not a depth format", desc.label, format);
                Error::InvalidResource(format!("Pipeline '{}' has an invalid depth format", desc.label))
            })?),
            None => None,
        };

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(code.into()),
        });

        let push_constant_group = push_constant_group(desc.sampled_texture, desc.push_constant_size);
        let mut bind_group_layouts = Vec::with_capacity(2);
        if desc.sampled_texture {
            bind_group_layouts.push(&ctx.texture_layout);
        }
        if push_constant_group.is_some() {
            bind_group_layouts.push(&ctx.push_constant_layout);
        }

        let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&desc.label),
            bind_group_layouts: &bind_group_layouts,
            // Push constants go through a uniform block instead
            immediate_size: 0,
        });

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                format: vertex_format_to_wgpu(attr.format),
                offset: attr.offset as u64,
                shader_location: attr.location,
            })
            .collect();
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: desc.vertex_layout.stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_ENTRY_POINT),
                compilation_options: Default::default(),
                buffers: &vertex_buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_ENTRY_POINT),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: blend_state(desc.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull_mode_to_wgpu(desc.cull_mode),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Depth is attached but neither tested nor written
            depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        engine_debug!(SOURCE, "Pipeline '{}' created ({:?}, depth: {:?})", desc.label, color_format, depth_format);

        Ok(Self {
            pipeline,
            push_constant_size: desc.push_constant_size,
            push_constant_group,
            sampled_texture: desc.sampled_texture,
        })
    }
}

#[cfg(test)]
#[path = "wgpu_pipeline_tests.rs"]
mod tests;

/// Pipeline - Vulkan graphics pipeline built from an engine PipelineDesc

use ash::vk;
use lumen_engine::lumen::render::{BlendMode, CullMode, PipelineDesc, ShaderSource};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_err, engine_error};
use std::ffi::CStr;
use std::sync::Arc;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{texture_format_to_vk, vertex_format_to_vk};
use crate::vulkan_render_pass::RenderPassKey;

const ENTRY_POINT: &CStr = c"main";

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (texture set + vertex push constants)
    pub(crate) layout: vk::PipelineLayout,
    /// Size of the vertex-stage push constant range in bytes
    pub(crate) push_constant_size: u32,
    /// Whether set 0 is a texture set
    pub(crate) sampled_texture: bool,
}

pub(crate) fn blend_attachment(blend: BlendMode) -> vk::PipelineColorBlendAttachmentState {
    let attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA);
    match blend {
        BlendMode::Opaque => attachment.blend_enable(false),
        BlendMode::Alpha => attachment
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD),
    }
}

pub(crate) fn cull_mode_to_vk(cull_mode: CullMode) -> vk::CullModeFlags {
    match cull_mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

/// Extract SPIR-V words, rejecting sources this backend cannot consume
pub(crate) fn spirv_stages(desc: &PipelineDesc) -> Result<(&[u32], &[u32])> {
    match &desc.shader {
        ShaderSource::SpirV { vertex, fragment } => {
            if vertex.is_empty() || fragment.is_empty() {
                engine_error!(SOURCE, "Pipeline '{}' has an empty SPIR-V stage", desc.label);
                return Err(Error::InvalidResource(format!("Pipeline '{}' has an empty SPIR-V stage", desc.label)));
            }
            Ok((vertex, fragment))
        }
        ShaderSource::Wgsl(_) => {
            engine_error!(SOURCE, "Pipeline '{}' uses WGSL, the Vulkan backend needs SPIR-V", desc.label);
            Err(Error::InvalidResource(format!("Pipeline '{}' uses WGSL, SPIR-V required", desc.label)))
        }
    }
}

fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe {
        device
            .create_shader_module(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create shader module: {:?}", e))
    }
}

impl Pipeline {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        let (vertex_code, fragment_code) = spirv_stages(desc)?;
        if desc.push_constant_size % 4 != 0 {
            engine_error!(SOURCE, "Pipeline '{}' push constant size {} is not a multiple of 4",
                desc.label, desc.push_constant_size);
            return Err(Error::InvalidResource(format!("Pipeline '{}' has a misaligned push constant size", desc.label)));
        }

        let render_pass = ctx.render_pass(RenderPassKey {
            color: texture_format_to_vk(desc.color_format),
            depth: desc.depth_format.map(texture_format_to_vk),
            clear: true,
        })?;

        // Pipeline layout: optional texture set, optional vertex push constants
        let set_layouts = [ctx.texture_set_layout];
        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: desc.push_constant_size,
        }];
        let mut layout_create_info = vk::PipelineLayoutCreateInfo::default();
        if desc.sampled_texture {
            layout_create_info = layout_create_info.set_layouts(&set_layouts);
        }
        if desc.push_constant_size > 0 {
            layout_create_info = layout_create_info.push_constant_ranges(&push_constant_ranges);
        }
        let layout = unsafe {
            ctx.device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| map_vk_error("create pipeline layout", e))?
        };

        let modules = create_shader_module(&ctx.device, vertex_code).and_then(|vertex| {
            match create_shader_module(&ctx.device, fragment_code) {
                Ok(fragment) => Ok((vertex, fragment)),
                Err(e) => {
                    unsafe { ctx.device.destroy_shader_module(vertex, None) };
                    Err(e)
                }
            }
        });
        let (vertex_module, fragment_module) = match modules {
            Ok(modules) => modules,
            Err(e) => {
                unsafe { ctx.device.destroy_pipeline_layout(layout, None) };
                return Err(e);
            }
        };

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(ENTRY_POINT),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(ENTRY_POINT),
        ];

        let vertex_bindings = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: desc.vertex_layout.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: 0,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(false)
            .depth_write_enable(false)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = blend_attachment(desc.blend);
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);
        if desc.depth_format.is_some() {
            pipeline_create_info = pipeline_create_info.depth_stencil_state(&depth_stencil_state);
        }

        let pipelines = unsafe {
            ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
        };

        unsafe {
            ctx.device.destroy_shader_module(vertex_module, None);
            ctx.device.destroy_shader_module(fragment_module, None);
        }

        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { ctx.device.destroy_pipeline_layout(layout, None) };
                return Err(map_vk_error("create graphics pipeline", e));
            }
        };

        engine_debug!(SOURCE, "Pipeline '{}' created", desc.label);

        Ok(Self {
            ctx,
            pipeline,
            layout,
            push_constant_size: desc.push_constant_size,
            sampled_texture: desc.sampled_texture,
        })
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;

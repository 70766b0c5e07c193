/// Render pass cache
///
/// Render targets and pipelines share render passes by attachment formats.
/// Passes differing only in the color load op are compatible, so a framebuffer
/// built with the clearing pass is also used with the loading one.

use ash::vk;
use lumen_engine::lumen::Result;
use lumen_engine::{engine_debug, engine_err};
use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};

/// Identity of a cached render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RenderPassKey {
    pub color: vk::Format,
    pub depth: Option<vk::Format>,
    /// Clear the color attachment (load it otherwise)
    pub clear: bool,
}

/// Attachment descriptions for a key: color first, then the optional depth
pub(crate) fn attachment_descriptions(key: &RenderPassKey) -> Vec<vk::AttachmentDescription> {
    // Swapchain images carry nothing from the previous present
    let color = vk::AttachmentDescription::default()
        .format(key.color)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(if key.clear { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD })
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    let mut attachments = vec![color];

    if let Some(depth_format) = key.depth {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }

    attachments
}

fn create_render_pass(device: &ash::Device, key: &RenderPassKey) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(key);

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_attachment_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref));
    if key.depth.is_some() {
        subpass = subpass.depth_stencil_attachment(&depth_attachment_ref);
    }

    let (stage, access) = if key.depth.is_some() {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
    };

    // Wait for the acquire semaphore (signaled at color output) before writing
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stage)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stage)
        .dst_access_mask(access);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe {
        device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| map_vk_error("create render pass", e))
    }
}

impl GpuContext {
    /// Get or create the render pass for `key`
    ///
    /// Cached passes live as long as the context.
    pub(crate) fn render_pass(&self, key: RenderPassKey) -> Result<vk::RenderPass> {
        let mut cache = self
            .render_passes
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Render pass cache lock poisoned"))?;

        if let Some(&render_pass) = cache.get(&key) {
            return Ok(render_pass);
        }

        let render_pass = create_render_pass(&self.device, &key)?;
        engine_debug!(SOURCE, "Render pass created for {:?}", key);
        cache.insert(key, render_pass);
        Ok(render_pass)
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;

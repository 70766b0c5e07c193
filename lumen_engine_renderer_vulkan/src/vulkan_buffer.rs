/// Buffer - host-visible Vulkan buffer

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use lumen_engine::lumen::render::{BufferDesc, BufferUsage};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_err, engine_error};
use std::sync::Arc;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation (CPU-mapped)
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size in bytes
    pub(crate) size: u64,
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
    }
}

/// Check that `len` bytes written at `offset` stay inside a buffer of `size` bytes
pub(crate) fn check_write_range(size: u64, offset: u64, len: usize) -> Result<()> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => {
            engine_error!(SOURCE, "Buffer write of {} bytes at offset {} overflows buffer of {} bytes",
                len, offset, size);
            Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                len, offset, size
            )))
        }
    }
}

impl Buffer {
    /// Create a CPU-to-GPU buffer and bind its memory
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_error!(SOURCE, "Buffer '{}' requested with zero size", desc.label);
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.label)));
        }
        Self::with_usage(ctx, &desc.label, desc.size, buffer_usage_to_vk(desc.usage))
    }

    /// Create a transfer source buffer for uploads
    pub(crate) fn staging(ctx: Arc<GpuContext>, label: &str, size: u64) -> Result<Self> {
        Self::with_usage(ctx, label, size, vk::BufferUsageFlags::TRANSFER_SRC)
    }

    fn with_usage(ctx: Arc<GpuContext>, label: &str, size: u64, usage: vk::BufferUsageFlags) -> Result<Self> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: label,
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!(SOURCE, "Out of GPU memory for buffer '{}' (required: {:.2} MB)",
                            label, size_mb);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let bound = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset());
            let buffer = Self { ctx, buffer, allocation: Some(allocation), size };
            bound.map_err(|e| map_vk_error("bind buffer memory", e))?;

            Ok(buffer)
        }
    }

    /// Copy bytes into the mapped memory
    pub(crate) fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_write_range(self.size, offset, data.len())?;

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_err!(SOURCE, "Buffer update failed: no GPU allocation")
        })?;
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;

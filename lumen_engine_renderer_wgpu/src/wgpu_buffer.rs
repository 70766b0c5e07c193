/// Buffer - WebGPU buffer written through the queue
///
/// `Queue::write_buffer` only accepts 4-byte aligned offsets and sizes, while
/// callers write tightly packed data (u16 indices) at arbitrary offsets. Each
/// buffer keeps a CPU copy of its contents and uploads the aligned span
/// covering every write.

use lumen_engine::lumen::render::{BufferDesc, BufferUsage};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_err, engine_error};
use std::sync::{Arc, Mutex};

use crate::wgpu_context::{GpuContext, SOURCE};

/// WebGPU buffer implementation
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: wgpu::Buffer,
    /// CPU copy of the contents, same size as the GPU buffer
    shadow: Mutex<Vec<u8>>,
    /// Requested size in bytes
    size: u64,
}

pub(crate) fn buffer_usage_to_wgpu(usage: BufferUsage) -> wgpu::BufferUsages {
    let usage = match usage {
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => wgpu::BufferUsages::INDEX,
        BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
    };
    usage | wgpu::BufferUsages::COPY_DST
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

/// Round a buffer size up to the copy alignment
pub(crate) fn aligned_size(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// Copy-aligned byte range covering `len` bytes at `offset`
pub(crate) fn aligned_span(offset: u64, len: u64) -> (u64, u64) {
    let start = offset / wgpu::COPY_BUFFER_ALIGNMENT * wgpu::COPY_BUFFER_ALIGNMENT;
    (start, aligned_size(offset + len))
}

impl Buffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_error!(SOURCE, "Buffer '{}' requested with zero size", desc.label);
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.label)));
        }

        let gpu_size = aligned_size(desc.size);
        let shadow_len = usize::try_from(gpu_size).map_err(|_| Error::OutOfMemory)?;
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size: gpu_size,
            usage: buffer_usage_to_wgpu(desc.usage),
            mapped_at_creation: false,
        });

        Ok(Self { ctx, buffer, shadow: Mutex::new(vec![0; shadow_len]), size: desc.size })
    }

    /// Copy bytes into the buffer (visible to the next queue submission)
    pub(crate) fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_write_range(self.size, offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let mut shadow = self
            .shadow
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Buffer shadow lock poisoned"))?;
        let start = offset as usize;
        shadow[start..start + data.len()].copy_from_slice(data);

        let (span_start, span_end) = aligned_span(offset, data.len() as u64);
        self.ctx
            .queue
            .write_buffer(&self.buffer, span_start, &shadow[span_start as usize..span_end as usize]);
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
#[path = "wgpu_buffer_tests.rs"]
mod tests;

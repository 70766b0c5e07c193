/// SPIR-V loading for the UI pipeline
///
/// Vulkan pipelines take precompiled SPIR-V; the UI stages are read from
/// `ui.vert.spv` and `ui.frag.spv` in a shader directory.

use lumen_engine::lumen::render::ShaderSource;
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::io::Cursor;
use std::path::Path;

use crate::vulkan_context::SOURCE;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// File names of the UI stages inside a shader directory
pub const UI_VERTEX_SHADER_FILE: &str = "ui.vert.spv";
pub const UI_FRAGMENT_SHADER_FILE: &str = "ui.frag.spv";

/// Convert a SPIR-V binary to words, fixing endianness
pub fn load_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| {
        engine_error!(SOURCE, "Invalid SPIR-V binary: {}", e);
        Error::InvalidResource(format!("invalid SPIR-V binary: {}", e))
    })?;
    if words.first() != Some(&SPIRV_MAGIC) {
        engine_error!(SOURCE, "SPIR-V binary does not start with the SPIR-V magic number");
        return Err(Error::InvalidResource("missing SPIR-V magic number".to_string()));
    }
    Ok(words)
}

/// Read the UI shader stages from `dir`
pub fn ui_shader_from_dir(dir: &Path) -> Result<ShaderSource> {
    let read_stage = |name: &str| -> Result<Vec<u32>> {
        let path = dir.join(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            engine_error!(SOURCE, "Failed to read {}: {}", path.display(), e);
            Error::InvalidResource(format!("cannot read {}: {}", path.display(), e))
        })?;
        load_spirv(&bytes)
    };

    Ok(ShaderSource::SpirV {
        vertex: read_stage(UI_VERTEX_SHADER_FILE)?,
        fragment: read_stage(UI_FRAGMENT_SHADER_FILE)?,
    })
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;

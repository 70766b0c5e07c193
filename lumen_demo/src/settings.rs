//! Demo settings read from the environment
//!
//! - `LUMEN_BACKEND`: `vulkan` (default) or `wgpu`
//! - `LUMEN_VALIDATION`: `1`/`true`/`on` or `0`/`false`/`off`
//!   (default: on in debug builds)
//! - `LUMEN_UI_SPIRV_DIR`: directory holding `ui.vert.spv` and `ui.frag.spv`
//!   for the Vulkan backend

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const BACKEND_VAR: &str = "LUMEN_BACKEND";
pub const VALIDATION_VAR: &str = "LUMEN_VALIDATION";
pub const SPIRV_DIR_VAR: &str = "LUMEN_UI_SPIRV_DIR";

/// Directory searched for the UI SPIR-V when `LUMEN_UI_SPIRV_DIR` is unset
pub const DEFAULT_SPIRV_DIR: &str = "lumen_engine_renderer_vulkan/shaders";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Vulkan,
    Wgpu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSettings {
    pub backend: BackendChoice,
    pub validation: bool,
    pub spirv_dir: PathBuf,
}

pub fn parse_backend(value: &str) -> Result<BackendChoice> {
    match value.trim().to_ascii_lowercase().as_str() {
        "vulkan" | "vk" => Ok(BackendChoice::Vulkan),
        "wgpu" | "webgpu" => Ok(BackendChoice::Wgpu),
        other => bail!("unknown {} value {:?} (expected vulkan or wgpu)", BACKEND_VAR, other),
    }
}

pub fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("unknown {} value {:?} (expected 1 or 0)", name, other),
    }
}

impl DemoSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build settings from a variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match var(BACKEND_VAR) {
            Some(value) => parse_backend(&value)?,
            None => BackendChoice::Vulkan,
        };
        let validation = match var(VALIDATION_VAR) {
            Some(value) => parse_flag(VALIDATION_VAR, &value)?,
            None => cfg!(debug_assertions),
        };
        let spirv_dir = var(SPIRV_DIR_VAR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_SPIRV_DIR));

        Ok(Self { backend, validation, spirv_dir })
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

use super::*;
use std::collections::HashMap;

fn settings(vars: &[(&str, &str)]) -> Result<DemoSettings> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    DemoSettings::from_vars(|name| vars.get(name).cloned())
}

#[test]
fn test_defaults() {
    let settings = settings(&[]).unwrap();
    assert_eq!(settings.backend, BackendChoice::Vulkan);
    assert_eq!(settings.validation, cfg!(debug_assertions));
    assert_eq!(settings.spirv_dir, PathBuf::from(DEFAULT_SPIRV_DIR));
}

#[test]
fn test_backend_names() {
    assert_eq!(parse_backend("wgpu").unwrap(), BackendChoice::Wgpu);
    assert_eq!(parse_backend(" WebGPU ").unwrap(), BackendChoice::Wgpu);
    assert_eq!(parse_backend("Vulkan").unwrap(), BackendChoice::Vulkan);
    assert!(parse_backend("metal").is_err());
}

#[test]
fn test_validation_flag() {
    assert!(settings(&[(VALIDATION_VAR, "1")]).unwrap().validation);
    assert!(!settings(&[(VALIDATION_VAR, "off")]).unwrap().validation);
    assert!(settings(&[(VALIDATION_VAR, "maybe")]).is_err());
}

#[test]
fn test_all_variables() {
    let settings = settings(&[
        (BACKEND_VAR, "wgpu"),
        (VALIDATION_VAR, "false"),
        (SPIRV_DIR_VAR, "/opt/lumen/spv"),
    ])
    .unwrap();
    assert_eq!(
        settings,
        DemoSettings { backend: BackendChoice::Wgpu, validation: false, spirv_dir: PathBuf::from("/opt/lumen/spv") }
    );
}

//! Unit tests for wgpu_context.rs (error mapping, no GPU)

use super::*;

#[test]
fn test_surface_timeout_is_transient() {
    let error = map_surface_error("acquire", wgpu::SurfaceError::Timeout);
    assert!(matches!(error, Error::Timeout(_)));
    assert!(error.is_transient());
}

#[test]
fn test_surface_out_of_memory() {
    assert_eq!(map_surface_error("acquire", wgpu::SurfaceError::OutOfMemory), Error::OutOfMemory);
}

#[test]
fn test_outdated_surface_maps_to_out_of_date() {
    assert_eq!(map_surface_error("acquire", wgpu::SurfaceError::Outdated), Error::SwapchainOutOfDate);
    assert_eq!(map_surface_error("acquire", wgpu::SurfaceError::Lost), Error::SwapchainOutOfDate);
}

#[test]
fn test_other_surface_error_is_backend_error() {
    let error = map_surface_error("acquire", wgpu::SurfaceError::Other);
    assert!(matches!(error, Error::BackendError(_)));
}

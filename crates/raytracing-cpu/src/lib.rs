//! Data-parallel CPU backend: traversal, path integration and progressive accumulation.
//!
//! Every pixel is an independent work item which touches only its own accumulator and
//! in-flight path, so passes run on a rayon pool without any synchronization.

use std::collections::TryReserveError;

use rayon::ThreadPoolBuildError;
use raytracing::{
    renderer::{RaytracerSettings, SettingsError},
    scene::{Camera, Scene},
};
use thiserror::Error;

mod accel;
mod frame;
mod geometry;
mod integrator;
mod materials;
mod ray;
mod sample;


pub use frame::{FrameDriver, ImageOrigin, PixelAccumulator};
pub use integrator::{Integrator, PathState, PathStatus, Termination, RAY_EPSILON};
pub use ray::Ray;
pub use sample::CpuSampler;

#[derive(Debug, Clone, Copy)]
pub struct CpuBackendSettings {
    pub num_threads: u32,
}

impl Default for CpuBackendSettings {
    fn default() -> Self {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        CpuBackendSettings { num_threads }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("resolution must be non-zero, got {width}x{height}")]
    ZeroResolution { width: u32, height: u32 },
    #[error("resolution {width}x{height} is too large")]
    ResolutionTooLarge { width: u32, height: u32 },
    #[error("failed to allocate frame accumulators: {0}")]
    AllocationFailed(#[from] TryReserveError),
    #[error("invalid render settings: {0}")]
    InvalidSettings(#[from] SettingsError),
    #[error("failed to create worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

/// Camera ray through screen coordinate `(s, t)`, `t = 0` being the bottom edge
pub fn generate_ray(camera: &Camera, s: f32, t: f32, sampler: &mut CpuSampler) -> Ray {
    let offset = if camera.lens_radius > 0.0 {
        let rd = sampler.sample_unit_disk();
        camera.u * (rd.0 * camera.lens_radius) + camera.v * (rd.1 * camera.lens_radius)
    } else {
        raytracing::geometry::Vec3::zero()
    };

    Ray {
        origin: camera.origin + offset,
        direction: camera.viewport_point(s, t) - camera.origin - offset,
        time: sampler.sample_uniform(),
    }
}

/// Renders until every pixel reaches its sample target and returns the resolved RGBA buffer,
/// row 0 at the top
pub fn render(
    scene: &Scene,
    settings: RaytracerSettings,
    backend_settings: CpuBackendSettings,
    width: u32,
    height: u32,
) -> Result<Vec<f32>, RenderError> {
    let mut driver = FrameDriver::new(width, height, settings, backend_settings)?;
    while !driver.is_complete() {
        driver.render_pass(scene);
    }
    Ok(driver.get_buffer())
}

use std::collections::TryReserveError;

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use raytracing::{
    geometry::Vec4,
    renderer::{ExecutionStyle, RaytracerSettings},
    scene::{Camera, Scene},
};
use tracing::debug;

use crate::{
    generate_ray,
    integrator::{Integrator, PathState, PathStatus},
    sample::CpuSampler,
    CpuBackendSettings, RenderError,
};

/// Which image row comes first in buffers returned by [`FrameDriver::get_buffer_with_origin`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Row 0 is the top of the image
    #[default]
    TopLeft,
    /// Row 0 is the bottom of the image, as GL-style textures expect
    BottomLeft,
}

/// Running per-pixel radiance sum
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelAccumulator {
    pub sum: Vec4,
    pub sample_count: u32,
}

impl PixelAccumulator {
    fn add_sample(&mut self, radiance: Vec4) {
        self.sum += radiance;
        self.sample_count += 1;
    }

    /// Mean radiance, zero for a pixel without samples
    pub fn resolve(&self) -> Vec4 {
        if self.sample_count == 0 {
            Vec4::zero()
        } else {
            self.sum / self.sample_count as f32
        }
    }
}

/// Progressive renderer state: one in-flight path and one accumulator per pixel.
///
/// Hosts call [`FrameDriver::render_pass`] repeatedly and read the image with
/// [`FrameDriver::get_buffer`] whenever they like; stopping early is just not calling
/// `render_pass` again. Pixels are stored row-major with row 0 at the top of the image.
pub struct FrameDriver {
    settings: RaytracerSettings,
    width: u32,
    height: u32,
    // viewport camera replacing the scene camera
    camera: Option<Camera>,

    paths: Vec<PathState>,
    pixels: Vec<PixelAccumulator>,

    seed: u64,
    pass_index: u64,
    pool: ThreadPool,
}

fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, value);
    Ok(v)
}

// screen coordinates put t = 0 at the bottom edge, rows count from the top
fn primary_ray(
    camera: &Camera,
    x: u32,
    row: u32,
    width: u32,
    height: u32,
    jitter: bool,
    sampler: &mut CpuSampler,
) -> crate::ray::Ray {
    let (jx, jy) = if jitter {
        (sampler.sample_uniform(), sampler.sample_uniform())
    } else {
        (0.5, 0.5)
    };
    let s = (x as f32 + jx) / width as f32;
    let t = ((height - 1 - row) as f32 + jy) / height as f32;
    generate_ray(camera, s, t, sampler)
}

impl FrameDriver {
    pub fn new(
        width: u32,
        height: u32,
        settings: RaytracerSettings,
        backend_settings: CpuBackendSettings,
    ) -> Result<Self, RenderError> {
        settings.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(backend_settings.num_threads as usize)
            .build()?;
        let seed = settings.seed.unwrap_or_else(rand::random);

        let mut driver = FrameDriver {
            settings,
            width: 0,
            height: 0,
            camera: None,
            paths: Vec::new(),
            pixels: Vec::new(),
            seed,
            pass_index: 0,
            pool,
        };
        driver.set_resolution(width, height)?;
        Ok(driver)
    }

    /// Reallocates the accumulators if the size changed and restarts accumulation either way
    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroResolution { width, height });
        }

        if (width, height) != (self.width, self.height) {
            let pixel_count = (width as usize)
                .checked_mul(height as usize)
                .ok_or(RenderError::ResolutionTooLarge { width, height })?;
            // drop the old buffers first so peak usage is a single frame
            self.paths = Vec::new();
            self.pixels = Vec::new();
            self.width = 0;
            self.height = 0;
            self.paths = try_filled(pixel_count, PathState::default())?;
            self.pixels = try_filled(pixel_count, PixelAccumulator::default())?;
            self.width = width;
            self.height = height;
            debug!(width, height, "allocated frame accumulators");
        }

        self.reset();
        Ok(())
    }

    /// Overrides the scene camera, `None` goes back to it. Restarts accumulation.
    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
        self.reset();
    }

    pub fn set_settings(&mut self, settings: RaytracerSettings) -> Result<(), RenderError> {
        settings.validate()?;
        if let Some(seed) = settings.seed {
            self.seed = seed;
        }
        self.settings = settings;
        self.reset();
        Ok(())
    }

    /// Clears every accumulator and in-flight path, e.g. after the scene was re-synced
    pub fn reset(&mut self) {
        self.paths.fill(PathState::default());
        self.pixels.fill(PixelAccumulator::default());
        self.pass_index = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn settings(&self) -> &RaytracerSettings {
        &self.settings
    }

    /// One data-parallel pass over all pixels. Returns how many paths completed.
    pub fn render_pass(&mut self, scene: &Scene) -> usize {
        let camera = self.camera.unwrap_or(scene.camera);
        let integrator = Integrator::new(scene, &self.settings);
        let target = self.settings.samples_per_pixel;
        let execution = self.settings.execution;
        let jitter = self.settings.antialias_primary_rays;
        let (width, height) = (self.width, self.height);
        let (seed, pass) = (self.seed, self.pass_index);

        let paths = &mut self.paths;
        let pixels = &mut self.pixels;

        let completed: usize = self.pool.install(|| {
            paths
                .par_iter_mut()
                .zip(pixels.par_iter_mut())
                .enumerate()
                .map(|(i, (path, pixel))| {
                    if pixel.sample_count >= target {
                        return 0;
                    }

                    let mut sampler = CpuSampler::for_pixel(seed, pass, i as u64);
                    let x = (i % width as usize) as u32;
                    let row = (i / width as usize) as u32;

                    match execution {
                        ExecutionStyle::BouncePerPass => {
                            if !path.is_active() {
                                let ray = primary_ray(&camera, x, row, width, height, jitter, &mut sampler);
                                *path = integrator.start_path(ray);
                            }
                            match integrator.advance(path, &mut sampler) {
                                PathStatus::Continue => 0,
                                PathStatus::Terminated(_) => {
                                    pixel.add_sample(path.throughput);
                                    1
                                }
                            }
                        }
                        ExecutionStyle::FullPathPerPass => {
                            let ray = primary_ray(&camera, x, row, width, height, jitter, &mut sampler);
                            pixel.add_sample(integrator.trace_path(ray, &mut sampler));
                            1
                        }
                    }
                })
                .sum()
        });

        debug!(pass = self.pass_index, completed, "render pass");
        self.pass_index += 1;
        completed
    }

    /// Resolved image, row 0 at the top
    pub fn get_buffer(&self) -> Vec<f32> {
        self.get_buffer_with_origin(ImageOrigin::TopLeft)
    }

    /// Resolved image as `width * height` RGBA quadruples
    pub fn get_buffer_with_origin(&self, origin: ImageOrigin) -> Vec<f32> {
        let width = self.width as usize;
        let mut buffer = Vec::with_capacity(self.pixels.len() * 4);

        for row in 0..self.height as usize {
            let src_row = match origin {
                ImageOrigin::TopLeft => row,
                ImageOrigin::BottomLeft => self.height as usize - 1 - row,
            };
            for pixel in &self.pixels[src_row * width..(src_row + 1) * width] {
                let Vec4(r, g, b, a) = pixel.resolve();
                buffer.extend_from_slice(&[r, g, b, a]);
            }
        }

        buffer
    }

    /// Resolved value of one pixel, `row` counted from the top
    pub fn pixel(&self, x: u32, row: u32) -> Option<Vec4> {
        if x >= self.width || row >= self.height {
            return None;
        }
        Some(self.pixels[row as usize * self.width as usize + x as usize].resolve())
    }

    pub fn accumulators(&self) -> &[PixelAccumulator] {
        &self.pixels
    }

    pub fn samples_completed(&self) -> u64 {
        self.pixels.iter().map(|p| p.sample_count as u64).sum()
    }

    pub fn samples_total(&self) -> u64 {
        self.pixels.len() as u64 * self.settings.samples_per_pixel as u64
    }

    /// Fraction of the sample target reached, in [0, 1]
    pub fn progress(&self) -> f32 {
        let total = self.samples_total();
        if total == 0 {
            1.0
        } else {
            (self.samples_completed() as f64 / total as f64) as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.samples_completed() >= self.samples_total()
    }

    pub fn passes_rendered(&self) -> u64 {
        self.pass_index
    }
}

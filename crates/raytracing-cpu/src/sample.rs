use std::{
    f32,
    hash::{Hash, Hasher},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use raytracing::geometry::{Vec2, Vec3};
use rustc_hash::FxHasher;

/// Independent random stream. Each work item gets its own, so results do not depend on how
/// pixels are scheduled across threads.
#[derive(Debug, Clone)]
pub struct CpuSampler {
    rng: ChaCha8Rng,
}

impl CpuSampler {
    pub fn from_seed(seed: u64) -> Self {
        CpuSampler { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Stream for one pixel in one pass
    pub fn for_pixel(seed: u64, pass: u64, pixel: u64) -> Self {
        let mut hasher = FxHasher::default();
        (seed, pass, pixel).hash(&mut hasher);
        CpuSampler::from_seed(hasher.finish())
    }

    /// Uniform in [0, 1)
    pub fn sample_uniform(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    pub fn sample_uniform2(&mut self) -> Vec2 {
        Vec2(self.sample_uniform(), self.sample_uniform())
    }

    pub fn sample_unit_disk(&mut self) -> Vec2 {
        let u = self.sample_uniform2();
        let r = f32::sqrt(u.0);
        let theta = 2.0 * f32::consts::PI * u.1;
        Vec2(r * f32::cos(theta), r * f32::sin(theta))
    }

    /// Uniform point on the unit sphere
    pub fn sample_unit_sphere(&mut self) -> Vec3 {
        let a = 2.0 * f32::consts::PI * self.sample_uniform();
        let s = 2.0 * self.sample_uniform() - 1.0;
        let r = f32::sqrt(f32::max(0.0, 1.0 - s * s));
        Vec3(f32::cos(a) * r, f32::sin(a) * r, s)
    }
}

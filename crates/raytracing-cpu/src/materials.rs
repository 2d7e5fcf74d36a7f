use std::f32;

use raytracing::{
    geometry::{Vec3, Vec4},
    materials::Material,
};

use crate::sample::CpuSampler;

/// Lambertian evaluation of a [`Material`]. All directions are world space and unit length,
/// `normal` faces the incoming ray.
pub(crate) trait CpuMaterial {
    /// Cosine-distributed direction about `normal`
    fn sample(&self, wo: Vec3, normal: Vec3, sampler: &mut CpuSampler) -> Vec3;
    fn pdf(&self, wi: Vec3, normal: Vec3) -> f32;
    fn eval(&self, wi: Vec3, wo: Vec3, normal: Vec3) -> Vec4;
    fn emission(&self) -> Vec4;
}

impl CpuMaterial for Material {
    fn sample(&self, _wo: Vec3, normal: Vec3, sampler: &mut CpuSampler) -> Vec3 {
        // offsetting a uniform sphere point by the normal yields a cosine distribution
        let direction = normal + sampler.sample_unit_sphere();
        if direction.near_zero() {
            normal
        } else {
            direction.unit()
        }
    }

    fn pdf(&self, wi: Vec3, normal: Vec3) -> f32 {
        f32::max(0.0, Vec3::dot(normal, wi)) / f32::consts::PI
    }

    fn eval(&self, wi: Vec3, _wo: Vec3, normal: Vec3) -> Vec4 {
        self.base_color * (f32::max(0.0, Vec3::dot(normal, wi)) / f32::consts::PI)
    }

    fn emission(&self) -> Vec4 {
        self.emission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_normal(sampler: &mut CpuSampler) -> Vec3 {
        sampler.sample_unit_sphere()
    }

    #[test]
    fn samples_stay_above_the_surface() {
        let material = Material::default();
        let mut sampler = CpuSampler::from_seed(1);
        for _ in 0..10_000 {
            let normal = random_normal(&mut sampler);
            let wi = material.sample(normal, normal, &mut sampler);
            assert!(Vec3::dot(wi, normal) >= 0.0);
            assert!(material.pdf(wi, normal) > 0.0);
        }
    }

    #[test]
    fn axis_aligned_normals_work() {
        let material = Material::default();
        let mut sampler = CpuSampler::from_seed(2);
        for normal in [Vec3(0.0, 0.0, 1.0), Vec3(-1.0, 0.0, 0.0), Vec3(0.0, -1.0, 0.0)] {
            for _ in 0..1000 {
                let wi = material.sample(normal, normal, &mut sampler);
                assert!(material.pdf(wi, normal) > 0.0);
            }
        }
    }

    #[test]
    fn below_surface_directions_have_no_density() {
        let material = Material::default();
        let normal = Vec3(0.0, 1.0, 0.0);
        let below = Vec3(0.0, -1.0, 0.0);
        assert_eq!(material.pdf(below, normal), 0.0);
        assert_eq!(material.eval(below, normal, normal), Vec4::zero());
    }

    #[test]
    fn importance_sampled_estimate_converges_to_base_color() {
        let color = Vec4(0.8, 0.4, 0.2, 1.0);
        let material = Material::diffuse(color);
        let normal = Vec3(0.0, 0.0, 1.0);
        let wo = Vec3(0.3, 0.0, 1.0).unit();
        let mut sampler = CpuSampler::from_seed(3);

        let n = 20_000;
        let mut sum = Vec4::zero();
        for _ in 0..n {
            let wi = material.sample(wo, normal, &mut sampler);
            let pdf = material.pdf(wi, normal);
            if pdf > 0.0 {
                sum += material.eval(wi, wo, normal) / pdf;
            }
        }
        let mean = sum / n as f32;
        for (m, c) in [(mean.0, color.0), (mean.1, color.1), (mean.2, color.2)] {
            assert!((m - c).abs() < 0.01, "{mean:?} vs {color:?}");
        }
    }

    #[test]
    fn sampled_directions_are_cosine_distributed() {
        // E[cos] = 2/3 under a cosine density, 1/2 under a uniform one
        let material = Material::default();
        let normal = Vec3(0.0, 1.0, 0.0);
        let mut sampler = CpuSampler::from_seed(4);
        let n = 50_000;
        let mean_cos: f32 = (0..n)
            .map(|_| Vec3::dot(material.sample(normal, normal, &mut sampler), normal))
            .sum::<f32>()
            / n as f32;
        assert!((mean_cos - 2.0 / 3.0).abs() < 0.01, "mean cos = {mean_cos}");
    }
}

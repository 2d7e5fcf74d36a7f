use raytracing::{
    geometry::Vec4,
    renderer::{RaytracerSettings, TerminationPolicy},
    scene::Scene,
};
use tracing::warn;

use crate::{accel::intersect_scene, materials::CpuMaterial, ray::Ray, sample::CpuSampler};

// minimum hit distance, keeps bounced rays from re-hitting their own surface
pub const RAY_EPSILON: f32 = 1e-4;

/// In-flight state of one pixel's current path.
///
/// `remaining_depth == 0` means no path is in flight. Once a path terminates, `throughput`
/// holds its final radiance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathState {
    pub remaining_depth: u32,
    pub ray: Ray,
    pub throughput: Vec4,
}

impl PathState {
    pub fn is_active(&self) -> bool {
        self.remaining_depth > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Left the scene, picked up the background
    Miss,
    /// Hit an emissive surface
    Emission,
    /// Throughput fell below the cutoff
    Cutoff,
    /// Lost at russian roulette
    Roulette,
    /// Bounce budget used up without reaching a light
    DepthExhausted,
    /// Sampled direction had zero density or produced a non-finite weight
    InvalidSample,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStatus {
    Continue,
    Terminated(Termination),
}

/// Iterative path integrator over a committed scene
#[derive(Clone, Copy)]
pub struct Integrator<'a> {
    scene: &'a Scene,
    settings: &'a RaytracerSettings,
}

impl<'a> Integrator<'a> {
    pub fn new(scene: &'a Scene, settings: &'a RaytracerSettings) -> Self {
        Integrator { scene, settings }
    }

    pub fn start_path(&self, ray: Ray) -> PathState {
        PathState {
            remaining_depth: self.settings.max_ray_depth,
            ray,
            throughput: Vec4::splat(1.0),
        }
    }

    fn terminate(state: &mut PathState, reason: Termination) -> PathStatus {
        if !matches!(reason, Termination::Miss | Termination::Emission) {
            state.throughput = Vec4::zero();
        }
        state.remaining_depth = 0;
        PathStatus::Terminated(reason)
    }

    /// Traces one bounce of an active path and uses up one unit of its budget
    pub fn advance(&self, state: &mut PathState, sampler: &mut CpuSampler) -> PathStatus {
        let bounce = self.settings.max_ray_depth.saturating_sub(state.remaining_depth);
        state.remaining_depth = state.remaining_depth.saturating_sub(1);

        let Some(hit) = intersect_scene(self.scene, &state.ray, RAY_EPSILON, f32::INFINITY) else {
            state.throughput *= self.settings.background;
            return Self::terminate(state, Termination::Miss);
        };

        let material = self.scene.material(hit.material_idx);
        if material.is_emissive() {
            state.throughput *= material.emission();
            return Self::terminate(state, Termination::Emission);
        }

        let wo = -state.ray.direction.unit();
        let wi = material.sample(wo, hit.normal, sampler);
        let pdf = material.pdf(wi, hit.normal);
        if !(pdf > 0.0) {
            return Self::terminate(state, Termination::InvalidSample);
        }

        state.throughput *= material.eval(wi, wo, hit.normal) / pdf;
        if !state.throughput.is_finite() {
            warn!(?wi, pdf, "non-finite path throughput");
            return Self::terminate(state, Termination::InvalidSample);
        }

        state.ray = Ray {
            origin: hit.point,
            direction: wi,
            time: state.ray.time,
        };

        match self.settings.termination {
            TerminationPolicy::Cutoff { threshold } => {
                let t = state.throughput;
                if t.r() < threshold && t.g() < threshold && t.b() < threshold {
                    return Self::terminate(state, Termination::Cutoff);
                }
            }
            TerminationPolicy::RussianRoulette { min_depth } => {
                if bounce + 1 >= min_depth {
                    let survival = state.throughput.max_rgb().min(1.0);
                    if sampler.sample_uniform() >= survival {
                        return Self::terminate(state, Termination::Roulette);
                    }
                    state.throughput /= survival;
                }
            }
            TerminationPolicy::None => {}
        }

        if state.remaining_depth == 0 {
            return Self::terminate(state, Termination::DepthExhausted);
        }

        PathStatus::Continue
    }

    /// Traces a complete path and returns its radiance
    pub fn trace_path(&self, ray: Ray, sampler: &mut CpuSampler) -> Vec4 {
        let mut state = self.start_path(ray);
        loop {
            if let PathStatus::Terminated(_) = self.advance(&mut state, sampler) {
                return state.throughput;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use raytracing::{
        geometry::{Matrix4x4, Vec3, Vec3u},
        materials::Material,
        scene::{MeshData, SceneBuilder},
    };

    use super::*;

    // a large quad at z = 0 facing +z
    fn floor_scene(material: Material) -> Scene {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material("floor", material);
        let quad = MeshData::new(
            vec![Vec3(-100.0, -100.0, 0.0), Vec3(100.0, -100.0, 0.0), Vec3(100.0, 100.0, 0.0), Vec3(-100.0, 100.0, 0.0)],
            vec![Vec3u(0, 1, 2), Vec3u(2, 3, 0)],
        );
        let mesh = builder.add_mesh("floor", quad, &[m]).unwrap();
        builder.add_instance(mesh, Matrix4x4::identity()).unwrap();
        builder.build().unwrap()
    }

    fn down_ray() -> Ray {
        Ray { origin: Vec3(0.0, 0.0, 1.0), direction: Vec3(0.0, 0.0, -1.0), time: 0.0 }
    }

    #[test]
    fn emissive_hit_stops_after_one_bounce() {
        let scene = floor_scene(Material::emissive(Vec4(1.0, 1.0, 1.0, 1.0)));
        let settings = RaytracerSettings { background: Vec4::zero(), ..Default::default() };
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(0);

        let mut state = integrator.start_path(down_ray());
        let status = integrator.advance(&mut state, &mut sampler);
        assert_eq!(status, PathStatus::Terminated(Termination::Emission));
        assert_eq!(state.throughput, Vec4(1.0, 1.0, 1.0, 1.0));
        assert!(!state.is_active());
    }

    #[test]
    fn miss_returns_background() {
        let scene = SceneBuilder::new().build().unwrap();
        let background = Vec4(0.2, 0.3, 0.4, 1.0);
        let settings = RaytracerSettings { background, ..Default::default() };
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(0);
        assert_eq!(integrator.trace_path(down_ray(), &mut sampler), background);
    }

    #[test]
    fn diffuse_bounce_into_sky_is_albedo_times_background() {
        // above an infinite-ish floor every bounce escapes to the sky
        let albedo = Vec4(0.5, 0.25, 0.125, 1.0);
        let scene = floor_scene(Material::diffuse(albedo));
        let settings = RaytracerSettings {
            background: Vec4(1.0, 1.0, 1.0, 1.0),
            termination: TerminationPolicy::None,
            ..Default::default()
        };
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(9);

        let mut state = integrator.start_path(down_ray());
        assert_eq!(integrator.advance(&mut state, &mut sampler), PathStatus::Continue);
        assert_eq!(state.remaining_depth, settings.max_ray_depth - 1);
        assert!(state.ray.direction.z() >= 0.0);

        assert_eq!(
            integrator.advance(&mut state, &mut sampler),
            PathStatus::Terminated(Termination::Miss)
        );
        for (got, want) in [(state.throughput.0, albedo.0), (state.throughput.1, albedo.1), (state.throughput.2, albedo.2)] {
            assert!((got - want).abs() < 1e-5, "{:?}", state.throughput);
        }
    }

    #[test]
    fn budget_exhaustion_contributes_nothing() {
        let scene = floor_scene(Material::default());
        let settings = RaytracerSettings { max_ray_depth: 1, ..Default::default() };
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(1);

        let mut state = integrator.start_path(down_ray());
        let status = integrator.advance(&mut state, &mut sampler);
        assert_eq!(status, PathStatus::Terminated(Termination::DepthExhausted));
        assert_eq!(state.throughput, Vec4::zero());
    }

    #[test]
    fn dark_surfaces_are_cut_off() {
        let scene = floor_scene(Material::diffuse(Vec4(1e-4, 1e-4, 1e-4, 1.0)));
        let settings = RaytracerSettings::default();
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(2);

        let mut state = integrator.start_path(down_ray());
        let status = integrator.advance(&mut state, &mut sampler);
        assert_eq!(status, PathStatus::Terminated(Termination::Cutoff));
        assert_eq!(state.throughput, Vec4::zero());
    }

    #[test]
    fn russian_roulette_is_unbiased() {
        let albedo = Vec4(0.5, 0.5, 0.5, 1.0);
        let scene = floor_scene(Material::diffuse(albedo));
        let settings = RaytracerSettings {
            termination: TerminationPolicy::RussianRoulette { min_depth: 1 },
            ..Default::default()
        };
        let integrator = Integrator::new(&scene, &settings);
        let mut sampler = CpuSampler::from_seed(3);

        let n = 20_000;
        let mut sum = 0.0;
        let mut lost = 0;
        for _ in 0..n {
            let radiance = integrator.trace_path(down_ray(), &mut sampler);
            if radiance.r() == 0.0 {
                lost += 1;
            }
            sum += radiance.r();
        }
        // survives with p = 0.5 and is then reweighted back up to 1 * 0.5 / 0.5
        assert!(lost > n / 3 && lost < 2 * n / 3, "lost {lost} of {n}");
        assert!((sum / n as f32 - albedo.r()).abs() < 0.03);
    }
}

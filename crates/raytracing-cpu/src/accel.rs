use raytracing::{
    accel::{walk, BvhNode},
    geometry::Vec3,
    materials::MaterialIndex,
    scene::{Instance, Mesh, Scene},
};

use crate::{
    geometry::{intersect_aabb, ray_triangle_intersect},
    ray::Ray,
};

// all fields in the space of the ray that was traced
#[derive(Clone, Copy, Debug)]
pub(crate) struct HitInfo {
    pub(crate) t: f32,
    pub(crate) point: Vec3,
    // unit length, facing against the ray
    pub(crate) normal: Vec3,
    pub(crate) front_face: bool,

    pub(crate) material_idx: MaterialIndex,
}

/// Closest-hit query over one level of the hierarchy
pub(crate) trait Intersectable {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitInfo>;
}

/// Triangles of one mesh, in object space
pub(crate) struct MeshBlas<'scene> {
    scene: &'scene Scene,
    mesh: &'scene Mesh,
}

/// Instances of a scene, in world space
pub(crate) struct SceneTlas<'scene> {
    scene: &'scene Scene,
}

impl<'scene> SceneTlas<'scene> {
    pub(crate) fn new(scene: &'scene Scene) -> Self {
        SceneTlas { scene }
    }
}

// Threaded walk that keeps the closest leaf hit. `hit_leaf` gets the leaf id and the
// current t_max, which shrinks as hits are found so farther boxes get culled.
fn closest_hit<F>(
    nodes: &[BvhNode],
    root: i32,
    ray: &Ray,
    t_min: f32,
    t_max: f32,
    mut hit_leaf: F,
) -> Option<HitInfo>
where
    F: FnMut(u32, f32) -> Option<HitInfo>,
{
    let mut closest_t = t_max;
    let mut closest = None;

    walk(nodes, root, |node| match node.object() {
        Some(obj_id) => {
            if let Some(hit) = hit_leaf(obj_id, closest_t) {
                closest_t = hit.t;
                closest = Some(hit);
            }
            true
        }
        None => intersect_aabb(node.bounds(), ray, t_min, closest_t),
    });

    closest
}

impl Intersectable for MeshBlas<'_> {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitInfo> {
        let geometry = self.scene.geometry();
        closest_hit(
            self.scene.blas().nodes(),
            self.mesh.bvh_root,
            ray,
            t_min,
            t_max,
            |triangle, t_max| {
                let [p0, p1, p2] = geometry.triangle_vertices(triangle);
                let hit = ray_triangle_intersect(p0, p1, p2, ray, t_min, t_max)?;
                Some(HitInfo {
                    t: hit.t,
                    point: hit.point,
                    normal: hit.normal,
                    front_face: hit.front_face,
                    material_idx: geometry.triangle_material(triangle),
                })
            },
        )
    }
}

impl SceneTlas<'_> {
    fn hit_instance(&self, instance: &Instance, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitInfo> {
        let mesh = self.scene.meshes().get(instance.mesh as usize)?;

        let mut local_ray = ray.transform(instance.world_to_object());
        // world t maps to local t * scaling_factor once the local direction is normalized
        let scaling_factor = local_ray.direction.length();
        if !(scaling_factor > 0.0 && scaling_factor.is_finite()) {
            return None;
        }
        local_ray.direction /= scaling_factor;

        let blas = MeshBlas { scene: self.scene, mesh };
        let local_hit = blas.hit(&local_ray, t_min * scaling_factor, t_max * scaling_factor)?;

        let mut normal = instance.transform.apply_normal(local_hit.normal).unit();
        if Vec3::dot(ray.direction, normal) > 0.0 {
            normal = -normal;
        }

        Some(HitInfo {
            t: local_hit.t / scaling_factor,
            point: instance.transform.apply_point(local_hit.point),
            normal,
            front_face: local_hit.front_face,
            material_idx: local_hit.material_idx,
        })
    }
}

impl Intersectable for SceneTlas<'_> {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitInfo> {
        let tlas = self.scene.tlas()?;
        let instances = self.scene.instances();
        closest_hit(tlas.nodes(), 0, ray, t_min, t_max, |instance, t_max| {
            let instance = instances.get(instance as usize)?;
            self.hit_instance(instance, ray, t_min, t_max)
        })
    }
}

/// Closest hit against the whole scene
pub(crate) fn intersect_scene(scene: &Scene, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitInfo> {
    SceneTlas::new(scene).hit(ray, t_min, t_max)
}

use raytracing::geometry::{Vec3, AABB};

use crate::ray::Ray;

// |a| below this means the ray is parallel to the triangle plane or the triangle is degenerate
const PARALLEL_EPSILON: f32 = 1e-12;

#[derive(Clone, Copy, Debug)]
pub(crate) struct TriangleHit {
    pub(crate) t: f32,
    pub(crate) point: Vec3,
    // unit length, facing against the ray
    pub(crate) normal: Vec3,
    pub(crate) front_face: bool,
}

/// Slab test against the closed interval `[t_min, t_max]`
pub(crate) fn intersect_aabb(aabb: AABB, ray: &Ray, t_min: f32, t_max: f32) -> bool {
    let mut t_min = t_min;
    let mut t_max = t_max;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        let (lo, hi) = (aabb.minimum[axis], aabb.maximum[axis]);

        if direction == 0.0 {
            // axis-aligned ray, no division
            if origin < lo || origin > hi {
                return false;
            }
        } else {
            let t0 = (lo - origin) / direction;
            let t1 = (hi - origin) / direction;
            t_min = f32::max(t_min, f32::min(t0, t1));
            t_max = f32::min(t_max, f32::max(t0, t1));
            if t_min > t_max {
                return false;
            }
        }
    }

    t_min <= t_max
}

/// Moller-Trumbore, accepting `t` in `(t_min, t_max]`
pub(crate) fn ray_triangle_intersect(
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
    ray: &Ray,
    t_min: f32,
    t_max: f32,
) -> Option<TriangleHit> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;

    let h = Vec3::cross(ray.direction, e2);
    let a = Vec3::dot(e1, h);
    if a.abs() < PARALLEL_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - p0;
    let u = f * Vec3::dot(s, h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = Vec3::cross(s, e1);
    let v = f * Vec3::dot(ray.direction, q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * Vec3::dot(e2, q);
    if !(t > t_min && t <= t_max) {
        return None;
    }

    let outward_normal = Vec3::cross(e1, e2);
    let front_face = Vec3::dot(ray.direction, outward_normal) < 0.0;
    let normal = if front_face { outward_normal } else { -outward_normal };

    Some(TriangleHit {
        t,
        point: ray.at(t),
        normal: normal.unit(),
        front_face,
    })
}

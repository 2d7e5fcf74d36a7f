use super::{Transform, Vec3};

/// Axis-aligned bounding box
/// Defined by 2 points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub minimum: Vec3,
    pub maximum: Vec3
}

impl Default for AABB {
    fn default() -> Self {
        AABB::empty()
    }
}

impl AABB {
    pub fn new(minimum: Vec3, maximum: Vec3) -> AABB {
        AABB { minimum, maximum }
    }

    /// Inverted box, identity element of `surrounding_box`
    pub fn empty() -> AABB {
        AABB {
            minimum: Vec3::splat(f32::INFINITY),
            maximum: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.minimum.0 > self.maximum.0
            || self.minimum.1 > self.maximum.1
            || self.minimum.2 > self.maximum.2
    }

    /// Returns a box which surrounds both a and b
    pub fn surrounding_box(a: AABB, b: AABB) -> AABB {
        AABB {
            minimum: Vec3::elementwise_min(a.minimum, b.minimum),
            maximum: Vec3::elementwise_max(a.maximum, b.maximum),
        }
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.minimum = Vec3::elementwise_min(self.minimum, p);
        self.maximum = Vec3::elementwise_max(self.maximum, p);
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> AABB {
        let mut aabb = AABB::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    pub fn centroid(&self) -> Vec3 {
        (self.minimum + self.maximum) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.minimum, self.maximum);
        [
            Vec3(lo.0, lo.1, lo.2),
            Vec3(hi.0, lo.1, lo.2),
            Vec3(lo.0, hi.1, lo.2),
            Vec3(hi.0, hi.1, lo.2),
            Vec3(lo.0, lo.1, hi.2),
            Vec3(hi.0, lo.1, hi.2),
            Vec3(lo.0, hi.1, hi.2),
            Vec3(hi.0, hi.1, hi.2),
        ]
    }

    /// Bounding box of the 8 transformed corners
    pub fn transform_aabb(aabb: AABB, transform: &Transform) -> AABB {
        AABB::from_points(aabb.corners().map(|c| transform.apply_point(c)))
    }

    pub fn contains(&self, other: &AABB) -> bool {
        self.minimum.0 <= other.minimum.0
            && self.minimum.1 <= other.minimum.1
            && self.minimum.2 <= other.minimum.2
            && self.maximum.0 >= other.maximum.0
            && self.maximum.1 >= other.maximum.1
            && self.maximum.2 >= other.maximum.2
    }
}

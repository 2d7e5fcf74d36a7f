use raytracing::geometry::{Matrix4x4, Vec3};

/// Direction is not required to be unit length
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    // reserved for motion blur
    pub time: f32,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Origin as a point, direction as a vector; the direction keeps whatever length the
    /// matrix gives it
    pub fn transform(&self, m: &Matrix4x4) -> Ray {
        Ray {
            origin: m.apply_point(self.origin),
            direction: m.apply_vector(self.direction),
            time: self.time,
        }
    }
}

use super::{Matrix4x4, Vec3};

/// Affine transform stored together with its inverse
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    forward: Matrix4x4,
    inverse: Matrix4x4
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Transform { forward: Matrix4x4::identity(), inverse: Matrix4x4::identity() }
    }

    /// Fails on singular matrices
    pub fn try_from_matrix(forward: Matrix4x4) -> Option<Self> {
        let inverse = forward.invert()?;
        Some(Transform { forward, inverse })
    }

    /// Caller guarantees that `inverse` really is the inverse of `forward`
    pub fn from_parts(forward: Matrix4x4, inverse: Matrix4x4) -> Self {
        Transform { forward, inverse }
    }

    pub fn forward(&self) -> &Matrix4x4 {
        &self.forward
    }

    pub fn inverse(&self) -> &Matrix4x4 {
        &self.inverse
    }

    pub fn apply_point(&self, point: Vec3) -> Vec3 {
        self.forward.apply_point(point)
    }

    pub fn apply_vector(&self, vector: Vec3) -> Vec3 {
        self.forward.apply_vector(vector)
    }

    pub fn apply_inverse_point(&self, point: Vec3) -> Vec3 {
        self.inverse.apply_point(point)
    }

    // normals go through the inverse transpose; result is not normalized
    pub fn apply_normal(&self, normal: Vec3) -> Vec3 {
        self.inverse.apply_vector_transposed(normal)
    }
}

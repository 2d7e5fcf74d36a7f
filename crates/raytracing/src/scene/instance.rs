use crate::geometry::{Matrix4x4, Transform, AABB};

use super::MeshIndex;

pub type InstanceIndex = u32;

/// Placement of a mesh in the world
#[derive(Debug, Clone, Copy)]
pub struct Instance {
    // world-space box, contains the transformed mesh
    pub bounds: AABB,
    // object -> world, inverse is world -> object
    pub transform: Transform,
    pub mesh: MeshIndex,
}

impl Instance {
    pub fn object_to_world(&self) -> &Matrix4x4 {
        self.transform.forward()
    }

    pub fn world_to_object(&self) -> &Matrix4x4 {
        self.transform.inverse()
    }
}

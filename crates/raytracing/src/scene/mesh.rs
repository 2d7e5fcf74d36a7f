use crate::{
    accel::NO_NODE,
    geometry::{Vec3, Vec3u, AABB},
    materials::MaterialIndex,
};

pub type MeshIndex = u32;

/// Exporter-side triangle mesh. Vertex indices are local to `vertices`.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Vec3u>,
    // per-triangle material slot, empty means slot 0 everywhere
    pub triangle_slots: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<Vec3u>) -> MeshData {
        MeshData { vertices, triangles, triangle_slots: Vec::new() }
    }

    pub fn with_slots(mut self, triangle_slots: Vec<u32>) -> MeshData {
        self.triangle_slots = triangle_slots;
        self
    }
}

/// Triangle range of one mesh within the shared [`GeometryStore`] buffers
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub start: u32,
    pub end: u32,
    // object-space bounds of the referenced vertices
    pub bounds: AABB,
    // root of this mesh's subtree in the scene's BLAS node array
    pub bvh_root: i32,
}

impl Mesh {
    pub(crate) fn new(name: String, start: u32, end: u32, bounds: AABB) -> Mesh {
        Mesh { name, start, end, bounds, bvh_root: NO_NODE }
    }

    pub fn triangle_count(&self) -> u32 {
        self.end - self.start
    }

    pub fn triangle_range(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }
}

/// Flat geometry buffers shared by every mesh; triangle indices are global
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Vec3u>,
    pub material_indices: Vec<MaterialIndex>,
    pub meshes: Vec<Mesh>,
}

impl GeometryStore {
    pub fn triangle_vertices(&self, triangle: u32) -> [Vec3; 3] {
        let Vec3u(a, b, c) = self.triangles[triangle as usize];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    pub fn triangle_bounds(&self, triangle: u32) -> AABB {
        AABB::from_points(self.triangle_vertices(triangle))
    }

    pub fn triangle_material(&self, triangle: u32) -> MaterialIndex {
        self.material_indices[triangle as usize]
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

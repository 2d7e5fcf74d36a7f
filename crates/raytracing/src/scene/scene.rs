use std::{collections::HashMap, time::Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    accel::{BuildPrimitive, Bvh, BvhBuildError, MAX_PRIMITIVES},
    geometry::{Matrix4x4, Transform, Vec3u, AABB},
    materials::{Material, MaterialIndex},
};

use super::{Camera, GeometryStore, Instance, InstanceIndex, Mesh, MeshData, MeshIndex};

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("mesh `{name}` has no triangles")]
    EmptyMesh { name: String },
    #[error("mesh `{name}`: triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    VertexIndexOutOfBounds {
        name: String,
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("mesh `{name}`: {slot_count} material slot entries for {triangle_count} triangles")]
    SlotCountMismatch {
        name: String,
        slot_count: usize,
        triangle_count: usize,
    },
    #[error("mesh `{name}`: triangle {triangle} uses material slot {slot} but the mesh has {slot_count} slots")]
    MaterialSlotOutOfBounds {
        name: String,
        triangle: usize,
        slot: u32,
        slot_count: usize,
    },
    #[error("mesh `{name}` references material {index} but the scene has {material_count} materials")]
    InvalidMaterialIndex {
        name: String,
        index: MaterialIndex,
        material_count: usize,
    },
    #[error("instance references unknown mesh {0}")]
    UnknownMesh(MeshIndex),
    #[error("instance of mesh {0} has a singular transform")]
    SingularTransform(MeshIndex),
    #[error("scene geometry exceeds the 32-bit index range")]
    IndexOverflow,
    #[error("failed to build acceleration structure: {0}")]
    Bvh(#[from] BvhBuildError),
}

/// Immutable render snapshot: geometry, both BVH levels, materials and camera.
///
/// Built once per sync through [`SceneBuilder`] and dropped when the next snapshot replaces it.
/// Read-only while rendering, so it can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,

    geometry: GeometryStore,
    // every mesh's BLAS, each mesh owns a disjoint subtree
    blas: Bvh,
    instances: Vec<Instance>,
    // None for a scene without instances, every ray misses
    tlas: Option<Bvh>,

    materials: Vec<Material>,
}

impl Scene {
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    pub fn blas(&self) -> &Bvh {
        &self.blas
    }

    pub fn tlas(&self) -> Option<&Bvh> {
        self.tlas.as_ref()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.geometry.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Unknown ids resolve to material 0, which always exists
    pub fn material(&self, index: MaterialIndex) -> &Material {
        self.materials
            .get(index as usize)
            .unwrap_or(&self.materials[0])
    }

    pub fn is_empty(&self) -> bool {
        self.tlas.is_none()
    }
}

/// Collects exporter output and commits it into a [`Scene`].
///
/// Materials and meshes are cached by name so re-exporting the same datablock is free.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    camera: Option<Camera>,

    geometry: GeometryStore,
    mesh_lookup: HashMap<String, MeshIndex>,

    materials: Vec<Material>,
    material_lookup: HashMap<String, MaterialIndex>,

    instances: Vec<Instance>,
}

impl SceneBuilder {
    pub fn new() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn set_camera(&mut self, camera: Camera) -> &mut Self {
        self.camera = Some(camera);
        self
    }

    pub fn add_material(&mut self, name: &str, material: Material) -> MaterialIndex {
        if let Some(&index) = self.material_lookup.get(name) {
            return index;
        }
        let index = self.materials.len() as MaterialIndex;
        self.materials.push(material);
        self.material_lookup.insert(name.to_owned(), index);
        index
    }

    pub fn mesh_index(&self, name: &str) -> Option<MeshIndex> {
        self.mesh_lookup.get(name).copied()
    }

    /// Appends a mesh to the shared buffers.
    ///
    /// Each triangle's slot (from `data.triangle_slots`) is remapped through `material_slots`
    /// to a global material id. A mesh without slots uses material 0 everywhere.
    pub fn add_mesh(
        &mut self,
        name: &str,
        data: MeshData,
        material_slots: &[MaterialIndex],
    ) -> Result<MeshIndex, SceneError> {
        if let Some(&index) = self.mesh_lookup.get(name) {
            return Ok(index);
        }

        let MeshData { vertices, triangles, triangle_slots } = data;
        let error_name = || name.to_owned();

        if triangles.is_empty() {
            return Err(SceneError::EmptyMesh { name: error_name() });
        }
        if !triangle_slots.is_empty() && triangle_slots.len() != triangles.len() {
            return Err(SceneError::SlotCountMismatch {
                name: error_name(),
                slot_count: triangle_slots.len(),
                triangle_count: triangles.len(),
            });
        }

        let vertex_offset = self.geometry.vertices.len();
        let triangle_offset = self.geometry.triangles.len();
        if vertex_offset + vertices.len() > u32::MAX as usize
            || triangle_offset + triangles.len() > MAX_PRIMITIVES
        {
            return Err(SceneError::IndexOverflow);
        }

        for (triangle, &Vec3u(a, b, c)) in triangles.iter().enumerate() {
            if let Some(&index) = [a, b, c].iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(SceneError::VertexIndexOutOfBounds {
                    name: error_name(),
                    triangle,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        let mut material_indices = Vec::with_capacity(triangles.len());
        if material_slots.is_empty() {
            material_indices.resize(triangles.len(), 0);
        } else {
            for triangle in 0..triangles.len() {
                let slot = triangle_slots.get(triangle).copied().unwrap_or(0);
                let Some(&material) = material_slots.get(slot as usize) else {
                    return Err(SceneError::MaterialSlotOutOfBounds {
                        name: error_name(),
                        triangle,
                        slot,
                        slot_count: material_slots.len(),
                    });
                };
                material_indices.push(material);
            }
        }

        let bounds = AABB::from_points(vertices.iter().copied());
        let offset = vertex_offset as u32;

        self.geometry.vertices.extend(vertices);
        self.geometry.triangles.extend(
            triangles
                .into_iter()
                .map(|Vec3u(a, b, c)| Vec3u(a + offset, b + offset, c + offset)),
        );
        self.geometry.material_indices.extend(material_indices);

        let index = self.geometry.meshes.len() as MeshIndex;
        self.geometry.meshes.push(Mesh::new(
            name.to_owned(),
            triangle_offset as u32,
            self.geometry.triangles.len() as u32,
            bounds,
        ));
        self.mesh_lookup.insert(name.to_owned(), index);

        Ok(index)
    }

    /// Places `mesh` in the world. The world box is derived from the mesh's object-space bounds.
    pub fn add_instance(
        &mut self,
        mesh: MeshIndex,
        object_to_world: Matrix4x4,
    ) -> Result<InstanceIndex, SceneError> {
        let mesh_bounds = self
            .geometry
            .meshes
            .get(mesh as usize)
            .ok_or(SceneError::UnknownMesh(mesh))?
            .bounds;
        let transform =
            Transform::try_from_matrix(object_to_world).ok_or(SceneError::SingularTransform(mesh))?;
        let bounds = AABB::transform_aabb(mesh_bounds, &transform);

        self.add_instance_with_bounds(mesh, bounds, transform)
    }

    /// Exporter path that supplies the world box and both matrices directly
    pub fn add_instance_with_bounds(
        &mut self,
        mesh: MeshIndex,
        bounds: AABB,
        transform: Transform,
    ) -> Result<InstanceIndex, SceneError> {
        if mesh as usize >= self.geometry.meshes.len() {
            return Err(SceneError::UnknownMesh(mesh));
        }
        let index = self.instances.len() as InstanceIndex;
        self.instances.push(Instance { bounds, transform, mesh });
        Ok(index)
    }

    /// Validates the collected data and builds both BVH levels
    pub fn build(self) -> Result<Scene, SceneError> {
        let start = Instant::now();
        let SceneBuilder {
            camera,
            mut geometry,
            mut materials,
            instances,
            ..
        } = self;

        if materials.is_empty() {
            if !geometry.triangles.is_empty() {
                warn!("scene has geometry but no materials, using fallback material");
            }
            materials.push(Material::fallback());
        }

        for mesh in &geometry.meshes {
            let bad_index = geometry.material_indices[mesh.start as usize..mesh.end as usize]
                .iter()
                .find(|&&m| m as usize >= materials.len());
            if let Some(&index) = bad_index {
                return Err(SceneError::InvalidMaterialIndex {
                    name: mesh.name.clone(),
                    index,
                    material_count: materials.len(),
                });
            }
        }

        let mut blas = Bvh::default();
        for i in 0..geometry.meshes.len() {
            let primitives: Vec<BuildPrimitive> = geometry.meshes[i]
                .triangle_range()
                .map(|triangle| BuildPrimitive {
                    bounds: geometry.triangle_bounds(triangle),
                    obj_id: triangle,
                })
                .collect();
            let root = blas.append(Bvh::build(&primitives)?)?;
            geometry.meshes[i].bvh_root = root;
        }

        let tlas = if instances.is_empty() {
            None
        } else {
            let primitives: Vec<BuildPrimitive> = instances
                .iter()
                .enumerate()
                .map(|(i, instance)| BuildPrimitive {
                    bounds: instance.bounds,
                    obj_id: i as u32,
                })
                .collect();
            Some(Bvh::build(&primitives)?)
        };

        let camera = camera.unwrap_or_else(|| {
            warn!("scene has no camera, using default");
            Camera::default()
        });

        info!(
            meshes = geometry.meshes.len(),
            triangles = geometry.triangles.len(),
            instances = instances.len(),
            materials = materials.len(),
            blas_nodes = blas.len(),
            elapsed = ?start.elapsed(),
            "committed scene"
        );

        Ok(Scene {
            camera,
            geometry,
            blas,
            instances,
            tlas,
            materials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Vec3, Vec4};

    fn quad() -> MeshData {
        MeshData::new(
            vec![
                Vec3(0.0, 0.0, 0.0),
                Vec3(1.0, 0.0, 0.0),
                Vec3(1.0, 1.0, 0.0),
                Vec3(0.0, 1.0, 0.0),
            ],
            vec![Vec3u(0, 1, 2), Vec3u(2, 3, 0)],
        )
    }

    #[test]
    fn empty_scene_has_fallback_material_and_no_tlas() {
        let scene = SceneBuilder::new().build().unwrap();
        assert!(scene.is_empty());
        assert_eq!(scene.materials(), &[Material::fallback()]);
    }

    #[test]
    fn meshes_share_offset_buffers() {
        let mut builder = SceneBuilder::new();
        let a = builder.add_mesh("a", quad(), &[]).unwrap();
        let b = builder.add_mesh("b", quad(), &[]).unwrap();
        builder.add_instance(a, Matrix4x4::identity()).unwrap();
        builder.add_instance(b, Matrix4x4::translation(Vec3(3.0, 0.0, 0.0))).unwrap();
        let scene = builder.build().unwrap();

        let geometry = scene.geometry();
        assert_eq!(geometry.vertices.len(), 8);
        assert_eq!(geometry.triangles[2], Vec3u(4, 5, 6));
        assert_eq!(scene.meshes()[1].triangle_range(), 2..4);
        // 3 nodes per two-triangle BLAS
        assert_eq!(scene.meshes()[0].bvh_root, 0);
        assert_eq!(scene.meshes()[1].bvh_root, 3);
        assert_eq!(scene.tlas().map(Bvh::len), Some(3));
    }

    #[test]
    fn material_slots_are_remapped_to_global_ids() {
        let mut builder = SceneBuilder::new();
        let red = builder.add_material("red", Material::diffuse(Vec4(1.0, 0.0, 0.0, 1.0)));
        let light = builder.add_material("light", Material::emissive(Vec4(1.0, 1.0, 1.0, 1.0)));
        assert_eq!(builder.add_material("red", Material::default()), red);

        let mesh = quad().with_slots(vec![1, 0]);
        builder.add_mesh("quad", mesh, &[red, light]).unwrap();
        let scene = builder.build().unwrap();

        assert_eq!(scene.geometry().material_indices, vec![light, red]);
    }

    #[test]
    fn same_mesh_name_returns_cached_index() {
        let mut builder = SceneBuilder::new();
        let first = builder.add_mesh("cube", quad(), &[]).unwrap();
        let second = builder.add_mesh("cube", quad(), &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.mesh_index("cube"), Some(first));
    }

    #[test]
    fn invalid_meshes_are_rejected() {
        let mut builder = SceneBuilder::new();
        let empty = MeshData::new(vec![Vec3::zero()], vec![]);
        assert!(matches!(builder.add_mesh("empty", empty, &[]), Err(SceneError::EmptyMesh { .. })));

        let bad_index = MeshData::new(vec![Vec3::zero(); 3], vec![Vec3u(0, 1, 3)]);
        assert!(matches!(
            builder.add_mesh("bad", bad_index, &[]),
            Err(SceneError::VertexIndexOutOfBounds { index: 3, .. })
        ));

        let bad_slot = quad().with_slots(vec![0, 2]);
        assert!(matches!(
            builder.add_mesh("slots", bad_slot, &[0, 0]),
            Err(SceneError::MaterialSlotOutOfBounds { slot: 2, .. })
        ));
    }

    #[test]
    fn unknown_material_fails_build() {
        let mut builder = SceneBuilder::new();
        builder.add_mesh("quad", quad(), &[5]).unwrap();
        assert!(matches!(
            builder.build(),
            Err(SceneError::InvalidMaterialIndex { index: 5, .. })
        ));
    }

    #[test]
    fn instance_bounds_follow_transform() {
        let mut builder = SceneBuilder::new();
        let mesh = builder.add_mesh("quad", quad(), &[]).unwrap();
        let m = Matrix4x4::matmul(
            Matrix4x4::translation(Vec3(0.0, 0.0, -4.0)),
            Matrix4x4::scale(Vec3(2.0, 2.0, 2.0)),
        );
        builder.add_instance(mesh, m).unwrap();

        assert_eq!(
            builder.add_instance(mesh, Matrix4x4::scale(Vec3(1.0, 0.0, 1.0))),
            Err(SceneError::SingularTransform(mesh))
        );
        assert_eq!(builder.add_instance(9, Matrix4x4::identity()), Err(SceneError::UnknownMesh(9)));

        let scene = builder.build().unwrap();
        let bounds = scene.instances()[0].bounds;
        assert_eq!(bounds.minimum, Vec3(0.0, 0.0, -4.0));
        assert_eq!(bounds.maximum, Vec3(2.0, 2.0, -4.0));
    }

    #[test]
    fn exporter_supplied_instance_is_kept_verbatim() {
        let mut builder = SceneBuilder::new();
        let mesh = builder.add_mesh("quad", quad(), &[]).unwrap();
        let forward = Matrix4x4::translation(Vec3(3.0, 0.0, 0.0));
        let inverse = Matrix4x4::translation(Vec3(-3.0, 0.0, 0.0));
        // exporters may hand over a looser box than the tight transformed one
        let bounds = AABB::new(Vec3(2.0, -1.0, -1.0), Vec3(5.0, 2.0, 1.0));

        let transform = Transform::from_parts(forward, inverse);
        assert_eq!(builder.add_instance_with_bounds(mesh, bounds, transform), Ok(0));
        assert_eq!(
            builder.add_instance_with_bounds(mesh + 1, bounds, transform),
            Err(SceneError::UnknownMesh(mesh + 1))
        );

        let scene = builder.build().unwrap();
        let instance = &scene.instances()[0];
        assert_eq!(instance.bounds, bounds);
        assert_eq!(instance.object_to_world(), &forward);
        assert_eq!(instance.world_to_object(), &inverse);
        assert_eq!(scene.tlas().map(|tlas| tlas.bounds(0)), Some(bounds));
    }

    #[test]
    fn unknown_material_id_resolves_to_fallback() {
        let scene = SceneBuilder::new().build().unwrap();
        assert_eq!(scene.material(42), &Material::fallback());
    }
}

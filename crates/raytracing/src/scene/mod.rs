mod camera;
mod instance;
mod mesh;
mod scene;

pub mod test_scenes;

pub use camera::Camera;
pub use instance::{Instance, InstanceIndex};
pub use mesh::{GeometryStore, Mesh, MeshData, MeshIndex};
pub use scene::{Scene, SceneBuilder, SceneError};

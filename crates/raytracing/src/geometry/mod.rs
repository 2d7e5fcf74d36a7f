mod aabb;
mod matrix4x4;
mod transform;
mod vec2;
mod vec3;
mod vec4;

pub use aabb::AABB;
pub use matrix4x4::Matrix4x4;
pub use transform::Transform;
pub use vec2::Vec2;
pub use vec3::Vec3;
pub use vec3::Vec3u;
pub use vec4::Vec4;

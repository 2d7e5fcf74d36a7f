//! Backend-independent half of the path tracer: math, BVH construction, scene snapshot and
//! render settings. Backends own ray generation, traversal and integration.

pub mod accel;
pub mod geometry;
pub mod materials;
pub mod renderer;
pub mod scene;

//! Acceleration structure
//! A flat binary BVH with precomputed threading links, shared by the BLAS (triangles of one mesh)
//! and TLAS (instances of a scene) levels. Backends supply the box test and leaf handler.

pub mod bvh2;

pub use bvh2::{walk, BuildPrimitive, Bvh, BvhBuildError, BvhNode, MAX_PRIMITIVES, NO_NODE};

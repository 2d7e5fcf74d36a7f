use crate::geometry::Vec4;

/// Index into the scene's material table. Id 0 always exists.
pub type MaterialIndex = u32;

/// Diffuse surface, optionally emissive.
///
/// A material whose emission has any positive rgb channel is treated as a pure light: paths
/// that hit it stop there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: Vec4,
    pub emission: Vec4,
}

impl Material {
    pub fn diffuse(base_color: Vec4) -> Material {
        Material { base_color, emission: Vec4::zero() }
    }

    pub fn emissive(emission: Vec4) -> Material {
        Material { base_color: Vec4::zero(), emission }
    }

    /// Magenta placeholder used when an exporter supplies no materials at all
    pub fn fallback() -> Material {
        let magenta = Vec4(1.0, 0.0, 1.0, 1.0);
        Material { base_color: magenta, emission: magenta }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.0 > 0.0 || self.emission.1 > 0.0 || self.emission.2 > 0.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::diffuse(Vec4(0.8, 0.8, 0.8, 1.0))
    }
}

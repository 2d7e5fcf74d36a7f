use thiserror::Error;

use crate::geometry::Vec4;

/// How paths with vanishing throughput are ended before their bounce budget runs out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationPolicy {
    /// Stop once every rgb throughput channel drops below `threshold`. Deterministic, slightly
    /// biased toward black.
    Cutoff { threshold: f32 },
    /// Starting at bounce `min_depth`, survive with probability `max(throughput)` and divide the
    /// throughput of survivors by it. Unbiased.
    RussianRoulette { min_depth: u32 },
    /// Only the bounce budget ends a path
    None,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        TerminationPolicy::Cutoff { threshold: DEFAULT_THROUGHPUT_CUTOFF }
    }
}

pub const DEFAULT_THROUGHPUT_CUTOFF: f32 = 1e-3;

/// What a single render pass does for each pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStyle {
    /// Advance every in-flight path by one bounce (wavefront style)
    #[default]
    BouncePerPass,
    /// Trace one complete path per pixel
    FullPathPerPass,
}

#[derive(Debug, Clone)]
pub struct RaytracerSettings {
    pub max_ray_depth: u32,
    pub samples_per_pixel: u32,
    // radiance of rays that leave the scene
    pub background: Vec4,
    pub termination: TerminationPolicy,
    pub execution: ExecutionStyle,
    pub seed: Option<u64>,

    pub antialias_primary_rays: bool,
}

impl Default for RaytracerSettings {
    fn default() -> Self {
        Self {
            max_ray_depth: 8,
            samples_per_pixel: 32,
            background: Vec4(1.0, 1.0, 1.0, 1.0),
            termination: TerminationPolicy::default(),
            execution: ExecutionStyle::default(),
            seed: None,

            antialias_primary_rays: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("max ray depth must be at least 1")]
    ZeroMaxDepth,
    #[error("samples per pixel must be at least 1")]
    ZeroSamples,
    #[error("throughput cutoff must be a finite non-negative number, got {0}")]
    InvalidCutoff(f32),
}

impl RaytracerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_ray_depth == 0 {
            return Err(SettingsError::ZeroMaxDepth);
        }
        if self.samples_per_pixel == 0 {
            return Err(SettingsError::ZeroSamples);
        }
        if let TerminationPolicy::Cutoff { threshold } = self.termination {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(SettingsError::InvalidCutoff(threshold));
            }
        }
        Ok(())
    }
}

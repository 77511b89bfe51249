//! Point-cloud level of detail.
//!
//! Dense meshes are drawn as a subset of their vertices. The kept fraction
//! (the *density*) falls in steps as the source grows, and the subset is taken
//! by uniform striding so a given density always yields the same points.

use glam::{Affine3A, Vec4};
use serde::{Deserialize, Serialize};
use wgpu::{PrimitiveTopology, VertexFormat};

use crate::errors::{Error, Result};
use crate::resources::geometry::{Attribute, Geometry, attr};

/// One row of the LOD table: sources with fewer than `below` vertices keep
/// `density` of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodStep {
    pub below: u32,
    pub density: f32,
}

/// Monotonically decreasing step function from vertex count to density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodTable {
    pub steps: Vec<LodStep>,
    /// Density for sources past the last step.
    pub floor: f32,
}

impl Default for LodTable {
    fn default() -> Self {
        let step = |below, density| LodStep { below, density };
        Self {
            steps: vec![
                step(50_000, 1.0),
                step(100_000, 0.75),
                step(200_000, 0.5),
                step(350_000, 0.3),
                step(500_000, 0.2),
                step(800_000, 0.15),
                step(1_000_001, 0.12),
            ],
            floor: 0.1,
        }
    }
}

impl LodTable {
    /// Rejects tables that are unsorted, increase in density, or leave (0, 1].
    pub fn validate(&self) -> Result<()> {
        let mut prev_below = 0;
        let mut prev_density = 1.0f32;
        for s in &self.steps {
            if s.below <= prev_below {
                return Err(Error::Config(format!("LOD thresholds must increase (at {})", s.below)));
            }
            if !(s.density > 0.0 && s.density <= prev_density) {
                return Err(Error::Config(format!(
                    "LOD density {} at {} must be in (0, {prev_density}]",
                    s.density, s.below
                )));
            }
            prev_below = s.below;
            prev_density = s.density;
        }
        if !(self.floor > 0.0 && self.floor <= prev_density) {
            return Err(Error::Config(format!("LOD floor {} out of range", self.floor)));
        }
        Ok(())
    }

    #[must_use]
    pub fn density_for(&self, vertex_count: u32) -> f32 {
        self.steps
            .iter()
            .find(|s| vertex_count < s.below)
            .map_or(self.floor, |s| s.density)
    }
}

/// Density chosen from the default table.
#[must_use]
pub fn auto_density(vertex_count: u32) -> f32 {
    LodTable::default().density_for(vertex_count)
}

/// An explicit density wins (clamped to (0, 1]); otherwise the table decides.
#[must_use]
pub fn resolve_density(vertex_count: u32, explicit: Option<f32>, table: &LodTable) -> f32 {
    match explicit {
        Some(d) if d.is_finite() && d > 0.0 => d.min(1.0),
        _ => table.density_for(vertex_count),
    }
}

/// Number of points kept for `len` sources at `density`.
#[must_use]
pub fn target_count(len: usize, density: f32) -> usize {
    if len == 0 {
        return 0;
    }
    let target = (len as f64 * f64::from(density.clamp(0.0, 1.0))).round() as usize;
    target.clamp(1, len)
}

/// Keeps `round(len * density)` items at evenly spaced positions, in order.
#[must_use]
pub fn stride_subsample<T: Clone>(items: &[T], density: f32) -> Vec<T> {
    let len = items.len();
    let target = target_count(len, density);
    if target == len {
        return items.to_vec();
    }
    let stride = len as f64 / target as f64;
    (0..target)
        .map(|i| items[((i as f64 * stride) as usize).min(len - 1)].clone())
        .collect()
}

/// Merges every part into one point geometry at a fixed density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCloudBuilder {
    density: f32,
}

impl PointCloudBuilder {
    #[must_use]
    pub fn new(density: f32) -> Self {
        Self {
            density: density.clamp(f32::MIN_POSITIVE, 1.0),
        }
    }

    #[must_use]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// World-space positions (and colors, when any part has them) of all
    /// parts, subsampled. Parts without colors contribute white.
    #[must_use]
    pub fn build<'a>(&self, parts: impl IntoIterator<Item = (&'a Geometry, Affine3A)>) -> Geometry {
        let mut points: Vec<([f32; 3], [f32; 4])> = Vec::new();
        let mut any_colors = false;

        for (geometry, transform) in parts {
            let colors = geometry.get_attribute(attr::COLOR);
            any_colors |= colors.is_some();
            for (i, p) in geometry.positions().into_iter().enumerate() {
                let color = colors
                    .and_then(|c| c.read_vec4(i as u32))
                    .unwrap_or(Vec4::ONE);
                points.push((transform.transform_point3(p).to_array(), color.to_array()));
            }
        }

        let kept = stride_subsample(&points, self.density);
        let positions: Vec<[f32; 3]> = kept.iter().map(|(p, _)| *p).collect();

        let mut geometry = Geometry::from_positions(&positions, None);
        geometry.topology = PrimitiveTopology::PointList;
        if any_colors {
            let colors: Vec<[f32; 4]> = kept.iter().map(|(_, c)| *c).collect();
            geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x4));
        }

        log::debug!(
            "Point cloud: kept {} of {} vertices (density {:.3})",
            kept.len(),
            points.len(),
            self.density
        );
        geometry
    }
}

use glam::{Affine3A, Vec3};

use crate::resources::geometry::{BoundingBox, Geometry};

/// Most points a hull may carry.
pub const DEFAULT_MAX_HULL_POINTS: usize = 256;

/// Reduced point set for a convex collision shape.
///
/// Built once per materialized mesh and never mutated; a changed mesh gets a
/// new hull.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderHull {
    pub points: Vec<Vec3>,
    /// Bounding diagonal cubed.
    pub mass_basis: f32,
    /// Too few independent points for a solid hull. The body still builds.
    pub low_fidelity: bool,
    pub source_vertices: usize,
}

impl ColliderHull {
    /// Body mass for a density multiplier.
    #[must_use]
    pub fn mass(&self, density_multiplier: f32) -> f32 {
        self.mass_basis * density_multiplier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderExtractor {
    max_points: usize,
}

impl Default for ColliderExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HULL_POINTS)
    }
}

impl ColliderExtractor {
    #[must_use]
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
        }
    }

    /// `diagonal³`; multiplied by the density multiplier to get the mass.
    #[must_use]
    pub fn mass_basis(diagonal: f32) -> f32 {
        diagonal.powi(3)
    }

    /// Every `ceil(n / max)`-th world-space position of all parts, in order.
    /// Inputs within the cap are returned unchanged.
    #[must_use]
    pub fn extract<'a>(&self, parts: impl IntoIterator<Item = (&'a Geometry, Affine3A)>) -> ColliderHull {
        let all: Vec<Vec3> = parts
            .into_iter()
            .flat_map(|(g, t)| g.positions().into_iter().map(move |p| t.transform_point3(p)))
            .collect();

        let total = all.len();
        let step = total.div_ceil(self.max_points).max(1);
        let points: Vec<Vec3> = all.iter().step_by(step).copied().collect();

        let diagonal = BoundingBox::from_points(all.iter().copied()).map_or(0.0, |b| b.diagonal());
        let low_fidelity = is_degenerate(&points, diagonal);
        if low_fidelity {
            log::warn!("Collider hull from {total} vertices is degenerate; using low-fidelity body");
        }

        ColliderHull {
            points,
            mass_basis: Self::mass_basis(diagonal),
            low_fidelity,
            source_vertices: total,
        }
    }
}

/// Fewer than four affinely independent points (no enclosed volume).
fn is_degenerate(points: &[Vec3], diagonal: f32) -> bool {
    if points.len() < 4 || diagonal <= f32::EPSILON {
        return true;
    }
    let eps = diagonal * 1e-4;
    let p0 = points[0];

    let Some(p1) = points.iter().copied().find(|p| p.distance(p0) > eps) else {
        return true;
    };
    let axis = p1 - p0;
    let Some(p2) = points
        .iter()
        .copied()
        .find(|p| axis.cross(*p - p0).length() > eps * axis.length())
    else {
        return true;
    };
    let normal = axis.cross(p2 - p0).normalize_or_zero();
    !points.iter().any(|p| normal.dot(*p - p0).abs() > eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_input_is_degenerate() {
        let quad = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        assert!(is_degenerate(&quad, 2.0_f32.sqrt()));
        let tetra = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        assert!(!is_degenerate(&tetra, 2.0_f32.sqrt()));
    }
}

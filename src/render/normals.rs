//! Vertex normal policy.
//!
//! Normals that came with the file are authoritative and are never
//! recomputed. Missing normals are derived from topology. The faceted and
//! smooth variants always work on a fresh geometry and never touch the
//! geometry they were derived from.

use crate::resources::geometry::Geometry;

pub struct NormalsPolicy;

impl NormalsPolicy {
    /// Computes area-weighted vertex normals if (and only if) they are absent.
    ///
    /// Returns `true` when normals were computed.
    pub fn ensure(geometry: &mut Geometry) -> bool {
        if geometry.has_normals() {
            return false;
        }
        geometry.compute_vertex_normals();
        log::debug!(
            "Computed {} vertex normals for geometry {}",
            geometry.vertex_count(),
            geometry.uuid
        );
        true
    }

    /// A faceted copy: every triangle corner owns its vertex and carries the
    /// face normal.
    #[must_use]
    pub fn faceted(source: &Geometry) -> Geometry {
        let mut flat = source.to_non_indexed();
        flat.compute_vertex_normals();
        flat.compute_bounding_volume();
        flat
    }

    /// A smooth copy of the pristine geometry: normals are averaged across all
    /// vertices sharing a position, so split seams shade continuously.
    #[must_use]
    pub fn smooth(pristine: &Geometry) -> Geometry {
        let mut smooth = pristine.duplicate();
        smooth.compute_welded_normals();
        smooth
    }
}

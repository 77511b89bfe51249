use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Affine3A, Vec3, Vec4};
use rustc_hash::FxHashMap;
use uuid::Uuid;
use wgpu::{PrimitiveTopology, VertexFormat};

/// Well-known attribute names.
pub mod attr {
    pub const POSITION: &str = "position";
    pub const NORMAL: &str = "normal";
    pub const COLOR: &str = "color";
    pub const UV: &str = "uv";
}

/// Attribute holds CPU-side data (`Arc<Vec<u8>>`) and layout metadata.
///
/// The byte buffer is shared between duplicated geometries and only copied
/// when one of them writes (`Arc::make_mut`).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub data: Arc<Vec<u8>>,

    /// Data version for change detection
    pub version: u64,

    pub format: VertexFormat,
    pub count: u32,
    pub stride: u64,
}

static NEXT_ATTR_VERSION: AtomicU64 = AtomicU64::new(1);

impl Attribute {
    /// Creates a planar (non-interleaved) attribute.
    pub fn new_planar<T: bytemuck::Pod>(data: &[T], format: VertexFormat) -> Self {
        let raw_data = bytemuck::cast_slice(data).to_vec();
        Self {
            data: Arc::new(raw_data),
            version: NEXT_ATTR_VERSION.fetch_add(1, Ordering::Relaxed),
            format,
            count: data.len() as u32,
            stride: std::mem::size_of::<T>() as u64,
        }
    }

    /// Replaces the data in place, copying only if the buffer is shared.
    pub fn update_data<T: bytemuck::Pod>(&mut self, new_data: &[T]) {
        let vec = Arc::make_mut(&mut self.data);
        let bytes: &[u8] = bytemuck::cast_slice(new_data);
        vec.clear();
        vec.extend_from_slice(bytes);
        self.count = new_data.len() as u32;
        self.stride = std::mem::size_of::<T>() as u64;
        self.version = NEXT_ATTR_VERSION.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn read<T>(&self, i: u32) -> Option<T>
    where
        T: bytemuck::Pod,
    {
        let offset = (i as usize) * self.stride as usize;
        let size = std::mem::size_of::<T>();
        let bytes = self.data.get(offset..offset + size)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    #[must_use]
    pub fn read_vec3(&self, i: u32) -> Option<Vec3> {
        if self.format != VertexFormat::Float32x3 {
            return None;
        }
        self.read::<[f32; 3]>(i).map(Vec3::from_array)
    }

    #[must_use]
    pub fn read_vec4(&self, i: u32) -> Option<Vec4> {
        match self.format {
            VertexFormat::Float32x4 => self.read::<[f32; 4]>(i).map(Vec4::from_array),
            VertexFormat::Float32x3 => self.read::<[f32; 3]>(i).map(|v| Vec3::from_array(v).extend(1.0)),
            _ => None,
        }
    }

    /// Collects every element as `Vec3` (Float32x3 only).
    #[must_use]
    pub fn to_vec3s(&self) -> Vec<Vec3> {
        (0..self.count).filter_map(|i| self.read_vec3(i)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        any.then_some(Self { min, max })
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the min→max diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        Self::from_points(corners.into_iter().map(|p| matrix.transform_point3(p)))
            .unwrap_or(*self)
    }
}

#[derive(Debug)]
pub struct Geometry {
    pub uuid: Uuid,

    // vertex layout versioning
    layout_version: u64,
    data_version: u64,

    attributes: FxHashMap<String, Attribute>,
    index_attribute: Option<Attribute>,

    pub topology: PrimitiveTopology,

    bounding_box: Option<BoundingBox>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            layout_version: 0,
            data_version: 0,
            attributes: FxHashMap::default(),
            index_attribute: None,
            topology: PrimitiveTopology::TriangleList,
            bounding_box: None,
        }
    }

    /// Convenience constructor from a position list and optional indices.
    #[must_use]
    pub fn from_positions(positions: &[[f32; 3]], indices: Option<&[u32]>) -> Self {
        let mut geometry = Self::new();
        geometry.set_attribute(attr::POSITION, Attribute::new_planar(positions, VertexFormat::Float32x3));
        if let Some(indices) = indices {
            geometry.set_indices_u32(indices);
        }
        geometry.compute_bounding_volume();
        geometry
    }

    /// Creates an independent copy with a fresh identity.
    ///
    /// Attribute bytes are shared copy-on-write, so a duplicate costs nothing
    /// until one side is modified.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            layout_version: self.layout_version,
            data_version: self.data_version,
            attributes: self.attributes.clone(),
            index_attribute: self.index_attribute.clone(),
            topology: self.topology,
            bounding_box: self.bounding_box,
        }
    }

    pub fn layout_version(&self) -> u64 {
        self.layout_version
    }

    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    pub fn attributes(&self) -> &FxHashMap<String, Attribute> {
        &self.attributes
    }

    pub fn index_attribute(&self) -> Option<&Attribute> {
        self.index_attribute.as_ref()
    }

    pub fn set_attribute(&mut self, name: &str, attr: Attribute) {
        let layout_changed = self
            .attributes
            .get(name)
            .is_none_or(|old| old.format != attr.format);

        self.attributes.insert(name.to_string(), attr);

        if layout_changed {
            self.layout_version = self.layout_version.wrapping_add(1);
        }
        self.data_version = self.data_version.wrapping_add(1);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.layout_version = self.layout_version.wrapping_add(1);
        }
        removed
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn set_indices_u32(&mut self, indices: &[u32]) {
        self.index_attribute = Some(Attribute::new_planar(indices, VertexFormat::Uint32));
        self.data_version = self.data_version.wrapping_add(1);
    }

    pub fn clear_indices(&mut self) {
        if self.index_attribute.take().is_some() {
            self.data_version = self.data_version.wrapping_add(1);
        }
    }

    /// Reads the index buffer as `u32` regardless of its stored width.
    #[must_use]
    pub fn indices(&self) -> Option<Vec<u32>> {
        let index_attr = self.index_attribute.as_ref()?;
        let bytes = index_attr.data.as_slice();
        match index_attr.format {
            VertexFormat::Uint16 => Some(
                bytes
                    .chunks_exact(2)
                    .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])))
                    .collect(),
            ),
            VertexFormat::Uint32 => Some(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index_attribute.is_some()
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.attributes.get(attr::POSITION).map_or(0, |a| a.count)
    }

    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.attributes.contains_key(attr::NORMAL)
    }

    #[must_use]
    pub fn has_vertex_colors(&self) -> bool {
        self.attributes.contains_key(attr::COLOR)
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Vec3> {
        self.attributes
            .get(attr::POSITION)
            .map(Attribute::to_vec3s)
            .unwrap_or_default()
    }

    /// Triangle corner indices, synthesized `0..n` for non-indexed geometry.
    /// Empty for point and line topologies.
    fn triangle_corners(&self) -> Vec<u32> {
        if self.topology != PrimitiveTopology::TriangleList {
            return Vec::new();
        }
        match self.indices() {
            Some(indices) => indices,
            None => (0..self.vertex_count() - self.vertex_count() % 3).collect(),
        }
    }

    /// Area-weighted per-vertex normals from the current topology.
    ///
    /// Overwrites any existing normal attribute; callers that must not pay for
    /// recomputation go through the normals policy instead.
    pub fn compute_vertex_normals(&mut self) {
        let Some(pos_attr) = self.attributes.get(attr::POSITION) else {
            return;
        };
        if pos_attr.format != VertexFormat::Float32x3 {
            return;
        }

        let positions = pos_attr.to_vec3s();
        let pos_count = positions.len();
        let mut normals = vec![Vec3::ZERO; pos_count];

        for tri in self.triangle_corners().chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= pos_count || i1 >= pos_count || i2 >= pos_count {
                continue;
            }
            let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);
            // |cross| == 2 * triangle area
            let face_normal = (v1 - v0).cross(v2 - v0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for n in &mut normals {
            *n = n.normalize_or_zero();
        }

        self.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }

    /// Normals averaged across every vertex sharing a position, so seams left
    /// by split vertices (UV islands, triangle soups) shade smoothly.
    pub fn compute_welded_normals(&mut self) {
        let positions = self.positions();
        if positions.is_empty() {
            return;
        }

        let key = |p: Vec3| -> [i64; 3] {
            let q = p * 1.0e5;
            [q.x.round() as i64, q.y.round() as i64, q.z.round() as i64]
        };

        let mut accumulated: FxHashMap<[i64; 3], Vec3> = FxHashMap::default();
        for tri in self.triangle_corners().chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
                continue;
            }
            let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);
            let face_normal = (v1 - v0).cross(v2 - v0);
            for v in [v0, v1, v2] {
                *accumulated.entry(key(v)).or_insert(Vec3::ZERO) += face_normal;
            }
        }

        let normals: Vec<Vec3> = positions
            .iter()
            .map(|p| accumulated.get(&key(*p)).copied().unwrap_or(Vec3::ZERO).normalize_or_zero())
            .collect();

        self.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }

    /// Expands indexed geometry so every triangle corner owns its vertex.
    ///
    /// Returns a new geometry; `self` is untouched. Non-indexed input is simply
    /// duplicated.
    #[must_use]
    pub fn to_non_indexed(&self) -> Geometry {
        let Some(indices) = self.indices() else {
            return self.duplicate();
        };

        let mut out = Geometry::new();
        out.topology = self.topology;

        for (name, src) in &self.attributes {
            let stride = src.stride as usize;
            let mut bytes = Vec::with_capacity(indices.len() * stride);
            for &i in &indices {
                let start = i as usize * stride;
                match src.data.get(start..start + stride) {
                    Some(chunk) => bytes.extend_from_slice(chunk),
                    None => bytes.extend(std::iter::repeat_n(0u8, stride)),
                }
            }
            out.set_attribute(
                name,
                Attribute {
                    data: Arc::new(bytes),
                    version: NEXT_ATTR_VERSION.fetch_add(1, Ordering::Relaxed),
                    format: src.format,
                    count: indices.len() as u32,
                    stride: src.stride,
                },
            );
        }
        out.bounding_box = self.bounding_box;
        out
    }

    pub fn compute_bounding_volume(&mut self) {
        self.bounding_box = BoundingBox::from_points(self.positions());
    }

    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    /// Bounding-box diagonal; zero for empty geometry.
    #[must_use]
    pub fn bounding_diagonal(&self) -> f32 {
        self.bounding_box
            .or_else(|| BoundingBox::from_points(self.positions()))
            .map_or(0.0, |b| b.diagonal())
    }
}

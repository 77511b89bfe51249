//! Mesh format loaders.
//!
//! Every parser turns raw bytes into a [`ParsedMesh`]: plain CPU-side geometry
//! and materials with no ownership registered anywhere yet. Installing the
//! result into the lifecycle manager happens in
//! [`MeshHandle::install`](crate::assets::MeshHandle::install), so a load that
//! turns out to be stale can be dropped without any cleanup.

mod gltf_loader;
mod obj;
mod off;
mod ply;
mod stl;

use std::fmt;

use glam::{Affine3A, Vec4};

use crate::assets::io::AssetReaderVariant;
use crate::assets::source::MeshSource;
use crate::errors::{AssetError, Result};
use crate::resources::geometry::Geometry;
use crate::resources::material::{Material, MaterialSettings, MaterialVariant, Side, StandardMaterial};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Obj,
    Stl,
    Ply,
    Off,
    Gltf,
    Glb,
}

impl MeshFormat {
    /// Maps a (case-insensitive) extension to a format. Unknown extensions
    /// are parsed as OBJ.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "stl" => Self::Stl,
            "ply" => Self::Ply,
            "off" => Self::Off,
            "gltf" => Self::Gltf,
            "glb" => Self::Glb,
            _ => Self::Obj,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Obj => "OBJ",
            Self::Stl => "STL",
            Self::Ply => "PLY",
            Self::Off => "OFF",
            Self::Gltf | Self::Glb => "glTF",
        }
    }

    /// Formats that carry no usable material and get the gray default.
    #[must_use]
    pub fn uses_default_material(self) -> bool {
        matches!(self, Self::Stl | Self::Ply | Self::Off)
    }

    #[must_use]
    pub fn is_gltf(self) -> bool {
        matches!(self, Self::Gltf | Self::Glb)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State for exactly one load request, dropped when the load completes.
pub struct LoadContext {
    pub load_id: u64,
    pub source: MeshSource,
    pub format: MeshFormat,
    reader: AssetReaderVariant,
    warnings: Vec<String>,
}

impl LoadContext {
    #[must_use]
    pub fn new(load_id: u64, source: MeshSource, reader: AssetReaderVariant) -> Self {
        let format = MeshFormat::from_extension(&source.extension());
        Self {
            load_id,
            source,
            format,
            reader,
            warnings: Vec::new(),
        }
    }

    /// Fetches a file next to the mesh (glTF buffers and images).
    pub async fn read_sibling(&self, uri: &str) -> Result<Vec<u8>> {
        let path = format!("{}/{}", self.source.category.segment(), uri);
        self.reader.read_bytes(&path).await
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("[load {}] {}: {}", self.load_id, self.source.filename, message);
        self.warnings.push(message);
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// One drawable part of a parsed file.
#[derive(Debug)]
pub struct ParsedPart {
    pub name: String,
    pub geometry: Geometry,
    /// Index into [`ParsedMesh::materials`].
    pub material: Option<usize>,
    pub transform: Affine3A,
}

impl ParsedPart {
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            material: None,
            transform: Affine3A::IDENTITY,
        }
    }
}

/// Format-independent parse result.
#[derive(Debug)]
pub struct ParsedMesh {
    pub format: MeshFormat,
    pub parts: Vec<ParsedPart>,
    /// Materials authored in the file (glTF only), in file order.
    pub materials: Vec<Material>,
    pub default_material: Option<Material>,
}

impl ParsedMesh {
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.parts.iter().map(|p| p.geometry.vertex_count()).sum()
    }
}

/// Flat mid-gray, double-sided. Assigned to formats without materials.
#[must_use]
pub fn default_material() -> Material {
    let pbr = StandardMaterial::new(Vec4::new(0.5, 0.5, 0.5, 1.0)).with_pbr(0.1, 0.8);
    Material::new(MaterialVariant::Standard(pbr))
        .with_name("default")
        .with_settings(MaterialSettings {
            side: Side::Double,
            ..MaterialSettings::default()
        })
}

/// Dispatches bytes to the parser for the context's format.
pub struct FormatLoader;

impl FormatLoader {
    /// Parses bytes already in memory.
    pub async fn load_bytes(ctx: &mut LoadContext, bytes: &[u8]) -> Result<ParsedMesh> {
        let format = ctx.format;
        let parts = match format {
            MeshFormat::Obj => obj::parse(bytes)?,
            MeshFormat::Stl => stl::parse(bytes)?,
            MeshFormat::Ply => ply::parse(bytes)?,
            MeshFormat::Off => off::parse(bytes)?,
            MeshFormat::Gltf | MeshFormat::Glb => return gltf_loader::load(ctx, bytes).await,
        };

        if parts.iter().all(|p| p.geometry.vertex_count() == 0) {
            return Err(AssetError::EmptyMesh(ctx.source.filename.clone()).into());
        }

        Ok(ParsedMesh {
            format,
            parts,
            materials: Vec::new(),
            default_material: format.uses_default_material().then(default_material),
        })
    }

    /// Fetches the source through the context's reader, then parses it.
    pub async fn load(ctx: &mut LoadContext) -> Result<ParsedMesh> {
        let url = ctx.source.url()?;
        log::info!("[load {}] Fetching {} mesh: {}", ctx.load_id, ctx.format, url);

        let relative = match &ctx.source.cache_token {
            Some(token) => format!("{}?v={}", ctx.source.relative_path(), token),
            None => ctx.source.relative_path(),
        };
        let bytes = ctx.reader.read_bytes(&relative).await?;
        let parsed = Self::load_bytes(ctx, &bytes).await?;

        log::info!(
            "[load {}] Parsed {}: {} part(s), {} vertices",
            ctx.load_id,
            ctx.source.filename,
            parsed.parts.len(),
            parsed.vertex_count()
        );
        Ok(parsed)
    }
}

// ============================================================================
// Shared text-parsing helpers
// ============================================================================

/// Strips `#` comments and surrounding whitespace; `None` for blank lines.
pub(crate) fn content_line(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    (!line.is_empty()).then_some(line)
}

/// Fan-triangulates a polygon given as a vertex index list.
pub(crate) fn triangulate_fan(polygon: &[u32], out: &mut Vec<u32>) {
    for i in 1..polygon.len().saturating_sub(1) {
        out.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
    }
}

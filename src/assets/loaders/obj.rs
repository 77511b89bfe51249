use std::io::BufReader;

use wgpu::VertexFormat;

use super::{ParsedPart, content_line};
use crate::errors::Result;
use crate::resources::geometry::{Attribute, Geometry, attr};

pub(super) fn parse(bytes: &[u8]) -> Result<Vec<ParsedPart>> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    // Materials are never taken from .mtl files; the viewer assigns its own.
    let (models, _materials) = tobj::load_obj_buf(&mut BufReader::new(bytes), &options, |_| {
        Err(tobj::LoadError::GenericFailure)
    })?;

    let mut parts: Vec<ParsedPart> = models
        .into_iter()
        .filter(|m| !m.mesh.positions.is_empty())
        .enumerate()
        .map(|(i, model)| {
            let name = if model.name.is_empty() {
                format!("obj_part_{i}")
            } else {
                model.name
            };
            ParsedPart::new(name, geometry_from_tobj(&model.mesh))
        })
        .collect();

    // Face-less files (scanned point clouds) carry only `v` lines.
    if parts.is_empty() {
        if let Some(geometry) = vertex_only_geometry(bytes) {
            parts.push(ParsedPart::new("obj_points", geometry));
        }
    }

    Ok(parts)
}

fn geometry_from_tobj(mesh: &tobj::Mesh) -> Geometry {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();

    let mut geometry = Geometry::new();
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));

    if mesh.normals.len() == mesh.positions.len() {
        let normals: Vec<[f32; 3]> = mesh.normals.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        geometry.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }

    if mesh.vertex_color.len() == mesh.positions.len() {
        let colors: Vec<[f32; 3]> = mesh
            .vertex_color
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x3));
    }

    if mesh.texcoords.len() / 2 == positions.len() && !mesh.texcoords.is_empty() {
        let uvs: Vec<[f32; 2]> = mesh.texcoords.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
        geometry.set_attribute(attr::UV, Attribute::new_planar(&uvs, VertexFormat::Float32x2));
    }

    if !mesh.indices.is_empty() {
        geometry.set_indices_u32(&mesh.indices);
    }

    geometry.compute_bounding_volume();
    geometry
}

fn vertex_only_geometry(bytes: &[u8]) -> Option<Geometry> {
    let text = String::from_utf8_lossy(bytes);
    let mut positions = Vec::new();
    let mut colors = Vec::new();

    for line in text.lines().filter_map(content_line) {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("v") {
            continue;
        }
        let values: Vec<f32> = tokens.filter_map(|t| t.parse().ok()).collect();
        if values.len() < 3 {
            continue;
        }
        positions.push([values[0], values[1], values[2]]);
        if values.len() >= 6 {
            colors.push([values[3], values[4], values[5]]);
        }
    }

    if positions.is_empty() {
        return None;
    }

    let mut geometry = Geometry::new();
    geometry.topology = wgpu::PrimitiveTopology::PointList;
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));
    if colors.len() == positions.len() {
        geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x3));
    }
    geometry.compute_bounding_volume();
    Some(geometry)
}

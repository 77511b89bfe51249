use glam::Vec3;
use wgpu::VertexFormat;

use super::{ParsedPart, content_line};
use crate::errors::{Result, parse_error};
use crate::resources::geometry::{Attribute, Geometry, attr};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

pub(super) fn parse(bytes: &[u8]) -> Result<Vec<ParsedPart>> {
    let (positions, facet_normals) = if is_binary(bytes) {
        parse_binary(bytes)?
    } else {
        parse_ascii(bytes)?
    };

    let mut geometry = Geometry::new();
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));

    // Exporters frequently write zero facet normals; only trust a complete set.
    if !facet_normals.is_empty() && facet_normals.iter().all(|n| n.length_squared() > 1e-12) {
        let normals: Vec<[f32; 3]> = facet_normals
            .iter()
            .flat_map(|n| {
                let n = n.normalize().to_array();
                [n, n, n]
            })
            .collect();
        geometry.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }

    geometry.compute_bounding_volume();
    Ok(vec![ParsedPart::new("stl", geometry)])
}

/// Binary files are recognized by their exact size; an ASCII header alone is
/// not reliable (many binary exporters start the header with "solid").
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    if count.checked_mul(TRIANGLE_LEN).and_then(|n| n.checked_add(HEADER_LEN + 4)) == Some(bytes.len()) {
        return true;
    }
    !bytes.starts_with(b"solid")
}

fn parse_binary(bytes: &[u8]) -> Result<(Vec<[f32; 3]>, Vec<Vec3>)> {
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let body = &bytes[HEADER_LEN + 4..];
    if count.checked_mul(TRIANGLE_LEN).is_none_or(|n| body.len() < n) {
        return Err(parse_error(
            "STL",
            format!("truncated binary file: {count} triangles declared, {} bytes of data", body.len()),
        ));
    }

    let read_vec3 = |chunk: &[u8]| -> [f32; 3] {
        let f = |o: usize| f32::from_le_bytes([chunk[o], chunk[o + 1], chunk[o + 2], chunk[o + 3]]);
        [f(0), f(4), f(8)]
    };

    let mut positions = Vec::with_capacity(count * 3);
    let mut normals = Vec::with_capacity(count);
    for tri in body.chunks_exact(TRIANGLE_LEN).take(count) {
        normals.push(Vec3::from_array(read_vec3(&tri[0..12])));
        positions.push(read_vec3(&tri[12..24]));
        positions.push(read_vec3(&tri[24..36]));
        positions.push(read_vec3(&tri[36..48]));
    }
    Ok((positions, normals))
}

fn parse_ascii(bytes: &[u8]) -> Result<(Vec<[f32; 3]>, Vec<Vec3>)> {
    let text = std::str::from_utf8(bytes).map_err(|e| parse_error("STL", e.to_string()))?;

    let parse_floats = |rest: &str, line_no: usize| -> Result<[f32; 3]> {
        let values: Vec<f32> = rest
            .split_whitespace()
            .map(str::parse)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| parse_error("STL", format!("line {line_no}: {e}")))?;
        match values.as_slice() {
            [x, y, z] => Ok([*x, *y, *z]),
            _ => Err(parse_error("STL", format!("line {line_no}: expected 3 components"))),
        }
    };

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let Some(line) = content_line(line) else {
            continue;
        };
        if let Some(rest) = line.strip_prefix("facet normal") {
            normals.push(Vec3::from_array(parse_floats(rest, i + 1)?));
        } else if let Some(rest) = line.strip_prefix("vertex") {
            positions.push(parse_floats(rest, i + 1)?);
        }
    }

    if positions.len() % 3 != 0 {
        return Err(parse_error("STL", "vertex count is not a multiple of 3"));
    }
    if normals.len() * 3 != positions.len() {
        normals.clear();
    }
    Ok((positions, normals))
}

use wgpu::VertexFormat;

use super::{ParsedPart, content_line, triangulate_fan};
use crate::errors::{Result, parse_error};
use crate::resources::geometry::{Attribute, Geometry, attr};

/// Parses an element count, bounded by the lines actually left in the file.
fn count(value: f64, what: &str, available: usize) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() > 0.0 {
        return Err(parse_error("OFF", format!("bad {what} count {value}")));
    }
    if value > available as f64 {
        return Err(parse_error(
            "OFF",
            format!("{what} count {value} exceeds the {available} lines left in the file"),
        ));
    }
    Ok(value as usize)
}

fn numbers(line: &str, line_no: usize) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| parse_error("OFF", format!("line {line_no}: bad number '{t}'")))
        })
        .collect()
}

/// Object File Format: an `OFF` / `COFF` / `NOFF` header, a
/// `vertex_count face_count edge_count` line, one vertex per line, then one
/// polygon per line (`n i0 .. in-1 [face color]`).
pub(super) fn parse(bytes: &[u8]) -> Result<Vec<ParsedPart>> {
    let text = std::str::from_utf8(bytes).map_err(|e| parse_error("OFF", e.to_string()))?;
    let mut lines = text
        .lines()
        .enumerate()
        .filter_map(|(i, l)| content_line(l).map(|l| (i + 1, l)));

    let (_, first) = lines.next().ok_or_else(|| parse_error("OFF", "empty file"))?;
    let (magic, rest) = first.split_once(char::is_whitespace).unwrap_or((first, ""));
    let (has_normals, has_colors) = match magic {
        "OFF" => (false, false),
        "COFF" => (false, true),
        "NOFF" => (true, false),
        "CNOFF" | "NCOFF" => (true, true),
        other => return Err(parse_error("OFF", format!("bad header '{other}'"))),
    };

    // Counts may share the header line.
    let counts = if rest.trim().is_empty() {
        let (no, line) = lines
            .next()
            .ok_or_else(|| parse_error("OFF", "missing element counts"))?;
        numbers(line, no)?
    } else {
        numbers(rest, 1)?
    };
    let [vertex_count, face_count, ..] = counts[..] else {
        return Err(parse_error("OFF", "expected vertex and face counts"));
    };
    let remaining = lines.clone().count();
    let vertex_count = count(vertex_count, "vertex", remaining)?;
    let face_count = count(face_count, "face", remaining - vertex_count)?;

    let stride = 3 + if has_normals { 3 } else { 0 } + if has_colors { 3 } else { 0 };
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::new();
    let mut colors = Vec::new();
    for _ in 0..vertex_count {
        let (no, line) = lines
            .next()
            .ok_or_else(|| parse_error("OFF", "unexpected end of file in vertex list"))?;
        let v = numbers(line, no)?;
        if v.len() < stride {
            return Err(parse_error("OFF", format!("line {no}: expected {stride} values")));
        }
        positions.push([v[0] as f32, v[1] as f32, v[2] as f32]);
        let mut k = 3;
        if has_normals {
            normals.push([v[k] as f32, v[k + 1] as f32, v[k + 2] as f32]);
            k += 3;
        }
        if has_colors {
            // Integer colors (0..255) vs float colors (0..1).
            let rgb = [v[k], v[k + 1], v[k + 2]];
            let scale = if rgb.iter().any(|c| *c > 1.0) { 1.0 / 255.0 } else { 1.0 };
            colors.push([(rgb[0] * scale) as f32, (rgb[1] * scale) as f32, (rgb[2] * scale) as f32]);
        }
    }

    let mut indices = Vec::with_capacity(face_count * 3);
    let mut polygon = Vec::new();
    for _ in 0..face_count {
        let (no, line) = lines
            .next()
            .ok_or_else(|| parse_error("OFF", "unexpected end of file in face list"))?;
        let f = numbers(line, no)?;
        let n = f.first().copied().unwrap_or(0.0) as usize;
        if f.len() <= n {
            return Err(parse_error("OFF", format!("line {no}: face lists {n} vertices")));
        }
        polygon.clear();
        for &i in &f[1..=n] {
            let i = i as u32;
            if i as usize >= vertex_count {
                return Err(parse_error("OFF", format!("line {no}: face index {i} out of range")));
            }
            polygon.push(i);
        }
        triangulate_fan(&polygon, &mut indices);
    }

    let mut geometry = Geometry::new();
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));
    if has_normals {
        geometry.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }
    if has_colors {
        geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x3));
    }
    if !indices.is_empty() {
        geometry.set_indices_u32(&indices);
    }
    geometry.compute_bounding_volume();

    Ok(vec![ParsedPart::new("off", geometry)])
}

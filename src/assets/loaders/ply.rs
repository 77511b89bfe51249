use wgpu::VertexFormat;

use super::{ParsedPart, triangulate_fan};
use crate::errors::{Result, parse_error};
use crate::resources::geometry::{Attribute, Geometry, attr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            other => return Err(parse_error("PLY", format!("unknown property type '{other}'"))),
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::List { name, .. } => name,
        }
    }
}

#[derive(Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    /// Fewest body bytes one row can occupy: fixed scalar widths in binary,
    /// one digit plus a separator per value in ASCII.
    fn min_row_size(&self, encoding: Encoding) -> usize {
        self.properties
            .iter()
            .map(|p| match (encoding, p) {
                (Encoding::Ascii, _) => 2,
                (_, Property::Scalar { ty, .. }) => ty.size(),
                (_, Property::List { count, .. }) => count.size(),
            })
            .sum()
    }
}

struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
    body_offset: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    const END: &[u8] = b"end_header";
    let end = bytes
        .windows(END.len())
        .position(|w| w == END)
        .ok_or_else(|| parse_error("PLY", "missing end_header"))?;
    let mut body_offset = end + END.len();
    // Header terminates with "\n" or "\r\n".
    if bytes.get(body_offset) == Some(&b'\r') {
        body_offset += 1;
    }
    if bytes.get(body_offset) == Some(&b'\n') {
        body_offset += 1;
    }

    let text = std::str::from_utf8(&bytes[..end]).map_err(|e| parse_error("PLY", e.to_string()))?;
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err(parse_error("PLY", "missing 'ply' magic"));
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", fmt, _version] => {
                encoding = Some(match *fmt {
                    "ascii" => Encoding::Ascii,
                    "binary_little_endian" => Encoding::LittleEndian,
                    "binary_big_endian" => Encoding::BigEndian,
                    other => return Err(parse_error("PLY", format!("unknown format '{other}'"))),
                });
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| parse_error("PLY", format!("bad element count '{count}'")))?;
                elements.push(Element {
                    name: (*name).to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| parse_error("PLY", "property before element"))?;
                element.properties.push(Property::List {
                    name: (*name).to_string(),
                    count: Scalar::parse(count)?,
                    item: Scalar::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| parse_error("PLY", "property before element"))?;
                element.properties.push(Property::Scalar {
                    name: (*name).to_string(),
                    ty: Scalar::parse(ty)?,
                });
            }
            _ => {} // comment, obj_info
        }
    }

    Ok(Header {
        encoding: encoding.ok_or_else(|| parse_error("PLY", "missing format line"))?,
        elements,
        body_offset,
    })
}

/// Sequential value reader over either encoding.
struct Cursor<'a> {
    encoding: Encoding,
    bytes: &'a [u8],
    pos: usize,
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl<'a> Cursor<'a> {
    fn new(encoding: Encoding, body: &'a [u8]) -> Result<Self> {
        let text = if encoding == Encoding::Ascii {
            std::str::from_utf8(body).map_err(|e| parse_error("PLY", e.to_string()))?
        } else {
            ""
        };
        Ok(Self {
            encoding,
            bytes: body,
            pos: 0,
            tokens: text.split_ascii_whitespace(),
        })
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read(&mut self, ty: Scalar) -> Result<f64> {
        if self.encoding == Encoding::Ascii {
            let token = self
                .tokens
                .next()
                .ok_or_else(|| parse_error("PLY", "unexpected end of data"))?;
            return token
                .parse::<f64>()
                .map_err(|_| parse_error("PLY", format!("bad number '{token}'")));
        }

        let size = ty.size();
        let raw = self
            .bytes
            .get(self.pos..self.pos.saturating_add(size))
            .ok_or_else(|| parse_error("PLY", "unexpected end of data"))?;
        self.pos += size;

        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(raw);
        if self.encoding == Encoding::BigEndian {
            buf[..size].reverse();
        }
        let le2 = [buf[0], buf[1]];
        let le4 = [buf[0], buf[1], buf[2], buf[3]];
        Ok(match ty {
            Scalar::I8 => f64::from(i8::from_le_bytes([buf[0]])),
            Scalar::U8 => f64::from(buf[0]),
            Scalar::I16 => f64::from(i16::from_le_bytes(le2)),
            Scalar::U16 => f64::from(u16::from_le_bytes(le2)),
            Scalar::I32 => f64::from(i32::from_le_bytes(le4)),
            Scalar::U32 => f64::from(u32::from_le_bytes(le4)),
            Scalar::F32 => f64::from(f32::from_le_bytes(le4)),
            Scalar::F64 => f64::from_le_bytes(buf),
        })
    }
}

pub(super) fn parse(bytes: &[u8]) -> Result<Vec<ParsedPart>> {
    let header = parse_header(bytes)?;
    let mut cursor = Cursor::new(header.encoding, &bytes[header.body_offset..])?;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut colors: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for element in &header.elements {
        // ASCII cursors do not advance `pos`, so their bound is the whole body.
        let row_size = element.min_row_size(header.encoding);
        if row_size == 0 {
            continue;
        }
        let budget = cursor.remaining() + 1;
        if element.count > budget / row_size {
            return Err(parse_error(
                "PLY",
                format!(
                    "element '{}' declares {} rows but only {budget} bytes of data remain",
                    element.name, element.count
                ),
            ));
        }

        let prop_index = |name: &str| element.properties.iter().position(|p| p.name() == name);

        match element.name.as_str() {
            "vertex" => {
                let (Some(ix), Some(iy), Some(iz)) = (prop_index("x"), prop_index("y"), prop_index("z")) else {
                    return Err(parse_error("PLY", "vertex element without x/y/z"));
                };
                let normal_idx = (prop_index("nx"), prop_index("ny"), prop_index("nz"));
                let color_idx = (
                    prop_index("red").or_else(|| prop_index("diffuse_red")),
                    prop_index("green").or_else(|| prop_index("diffuse_green")),
                    prop_index("blue").or_else(|| prop_index("diffuse_blue")),
                );
                // Integer channels are 0..255, float channels already 0..1.
                let color_scale = match color_idx.0.map(|i| &element.properties[i]) {
                    Some(Property::Scalar { ty: Scalar::F32 | Scalar::F64, .. }) => 1.0,
                    _ => 1.0 / 255.0,
                };

                positions.reserve(element.count);
                let mut row = vec![0.0f64; element.properties.len()];
                for _ in 0..element.count {
                    read_row(&mut cursor, &element.properties, &mut row)?;
                    positions.push([row[ix] as f32, row[iy] as f32, row[iz] as f32]);
                    if let (Some(a), Some(b), Some(c)) = normal_idx {
                        normals.push([row[a] as f32, row[b] as f32, row[c] as f32]);
                    }
                    if let (Some(r), Some(g), Some(b)) = color_idx {
                        colors.push([
                            (row[r] * color_scale) as f32,
                            (row[g] * color_scale) as f32,
                            (row[b] * color_scale) as f32,
                        ]);
                    }
                }
            }
            "face" => {
                let list_idx = prop_index("vertex_indices")
                    .or_else(|| prop_index("vertex_index"))
                    .ok_or_else(|| parse_error("PLY", "face element without vertex_indices"))?;
                let mut polygon = Vec::new();
                for _ in 0..element.count {
                    for (i, prop) in element.properties.iter().enumerate() {
                        match prop {
                            Property::Scalar { ty, .. } => {
                                cursor.read(*ty)?;
                            }
                            Property::List { count, item, .. } => {
                                let n = cursor.read(*count)? as usize;
                                polygon.clear();
                                for _ in 0..n {
                                    polygon.push(cursor.read(*item)? as u32);
                                }
                                if i == list_idx {
                                    triangulate_fan(&polygon, &mut indices);
                                }
                            }
                        }
                    }
                }
            }
            _ => {
                let mut row = vec![0.0f64; element.properties.len()];
                for _ in 0..element.count {
                    read_row(&mut cursor, &element.properties, &mut row)?;
                }
            }
        }
    }

    let vertex_count = positions.len() as u32;
    if let Some(bad) = indices.iter().find(|&&i| i >= vertex_count) {
        return Err(parse_error("PLY", format!("face index {bad} out of range ({vertex_count} vertices)")));
    }

    let mut geometry = Geometry::new();
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));
    if normals.len() == positions.len() && !normals.is_empty() {
        geometry.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }
    if colors.len() == positions.len() && !colors.is_empty() {
        geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x3));
    }
    if indices.is_empty() {
        geometry.topology = wgpu::PrimitiveTopology::PointList;
    } else {
        geometry.set_indices_u32(&indices);
    }
    geometry.compute_bounding_volume();

    Ok(vec![ParsedPart::new("ply", geometry)])
}

/// Reads one element row; list properties are consumed and recorded as 0.
fn read_row(cursor: &mut Cursor<'_>, properties: &[Property], row: &mut [f64]) -> Result<()> {
    for (slot, prop) in row.iter_mut().zip(properties) {
        *slot = match prop {
            Property::Scalar { ty, .. } => cursor.read(*ty)?,
            Property::List { count, item, .. } => {
                let n = cursor.read(*count)? as usize;
                for _ in 0..n {
                    cursor.read(*item)?;
                }
                0.0
            }
        };
    }
    Ok(())
}

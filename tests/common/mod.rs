//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use base64::Engine as _;
use glam::Vec4;
use serde_json::json;

use meshview::assets::{AssetReaderVariant, FormatLoader, LoadContext, MemoryAssetReader, ParsedMesh, ParsedPart};
use meshview::assets::{MeshCategory, MeshFormat, MeshHandle, MeshSource};
use meshview::resources::{Geometry, Material, MaterialVariant, ResourceLifecycleManager, StandardMaterial, Texture};

/// Unit cube with a center vertex on the top and bottom faces: 10 vertices,
/// 16 triangles, every vertex referenced.
pub const CUBE_OBJ: &str = "\
# cube with capped centers
o cube
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
v 0 1 0
v 1 1 0
v 1 1 1
v 0 1 1
v 0.5 0 0.5
v 0.5 1 0.5
f 9 2 1
f 9 3 2
f 9 4 3
f 9 1 4
f 10 5 6
f 10 6 7
f 10 7 8
f 10 8 5
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

pub const TETRA_OFF: &str = "OFF\n4 4 6\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n3 0 2 1\n3 0 1 3\n3 0 3 2\n3 1 2 3\n";

pub const COLORED_PLY: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 2
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1 0 0 0 255 0
1 1 0 0 0 255
0 1 0 255 255 255
3 0 1 2
3 0 2 3
";

pub const TRIANGLE_STL: &str = "solid t
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 2 0 0
vertex 0 2 0
endloop
endfacet
endsolid t
";

pub fn png_bytes(color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(color));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// A single textured triangle. Buffer and image are embedded as data URIs.
pub fn textured_gltf() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let uvs: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    let mut buffer: Vec<u8> = bytemuck::cast_slice(&positions).to_vec();
    buffer.extend_from_slice(bytemuck::cast_slice(&uvs));

    let doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "name": "tri_node" }],
        "meshes": [{
            "name": "tri",
            "primitives": [{
                "attributes": { "POSITION": 0, "TEXCOORD_0": 1 },
                "material": 0
            }]
        }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": {
                "baseColorTexture": { "index": 0 },
                "metallicFactor": 0.0
            }
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": data_uri("image/png", &png_bytes([200, 40, 40, 255])) }],
        "buffers": [{
            "byteLength": buffer.len(),
            "uri": data_uri("application/octet-stream", &buffer)
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }
        ]
    });
    serde_json::to_vec(&doc).unwrap()
}

pub fn memory_reader() -> MemoryAssetReader {
    MemoryAssetReader::new()
        .with_file("input/cube.obj", CUBE_OBJ.as_bytes().to_vec())
        .with_file("input/tetra.off", TETRA_OFF.as_bytes().to_vec())
        .with_file("input/quad.ply", COLORED_PLY.as_bytes().to_vec())
        .with_file("input/tri.stl", TRIANGLE_STL.as_bytes().to_vec())
        .with_file("generated/tri.gltf", textured_gltf())
        .with_file("input/broken.off", b"OFF\n3 1 0\n0 0 0\n".to_vec())
}

pub fn parse(reader: &MemoryAssetReader, category: MeshCategory, filename: &str) -> meshview::Result<ParsedMesh> {
    let source = MeshSource::new("https://meshes.example.com/files", category, filename);
    let mut ctx = LoadContext::new(1, source, AssetReaderVariant::memory(reader.clone()));
    pollster::block_on(FormatLoader::load(&mut ctx))
}

pub fn load(
    mgr: &mut ResourceLifecycleManager,
    reader: &MemoryAssetReader,
    category: MeshCategory,
    filename: &str,
) -> MeshHandle {
    let parsed = parse(reader, category, filename).unwrap();
    let source = MeshSource::new("https://meshes.example.com/files", category, filename);
    MeshHandle::install(parsed, source, 1, mgr)
}

/// A mesh with `n` scattered points and no faces.
pub fn point_mesh(n: usize) -> ParsedMesh {
    let positions: Vec<[f32; 3]> = (0..n)
        .map(|i| {
            let t = i as f32;
            [t.sin(), (t * 0.37).cos(), t / n as f32]
        })
        .collect();
    let mut geometry = Geometry::from_positions(&positions, None);
    geometry.topology = wgpu::PrimitiveTopology::PointList;
    ParsedMesh {
        format: MeshFormat::Ply,
        parts: vec![ParsedPart::new("scan", geometry)],
        materials: Vec::new(),
        default_material: None,
    }
}

/// An in-memory mesh with one textured part, as a glTF load would produce.
pub fn textured_parsed() -> ParsedMesh {
    let geometry = Geometry::from_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], Some(&[0, 1, 2]));
    let mut pbr = StandardMaterial::new(Vec4::ONE);
    pbr.map = Some(Texture::create_solid_color("albedo", [10, 20, 30, 255]));
    let mut part = ParsedPart::new("body", geometry);
    part.material = Some(0);
    ParsedMesh {
        format: MeshFormat::Glb,
        parts: vec![part],
        materials: vec![Material::new(MaterialVariant::Standard(pbr)).with_name("albedo_mat")],
        default_material: None,
    }
}

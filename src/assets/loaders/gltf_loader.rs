use std::sync::Arc;

use base64::Engine as _;
use futures::future::try_join_all;
use glam::{Affine3A, Mat4, Vec3, Vec4};
use wgpu::{AddressMode, FilterMode, PrimitiveTopology, TextureFormat, VertexFormat};

use super::{LoadContext, MeshFormat, ParsedMesh, ParsedPart};
use crate::errors::{AssetError, Result, parse_error};
use crate::resources::geometry::{Attribute, Geometry, attr};
use crate::resources::material::{Material, MaterialSettings, MaterialVariant, Side, StandardMaterial};
use crate::resources::texture::{Texture, TextureOrigin, TextureSampler};

/// Decoded image pixels, shared by every texture that samples the image.
struct DecodedImage {
    name: String,
    width: u32,
    height: u32,
    pixels: Arc<Vec<u8>>,
    origin: TextureOrigin,
}

pub(super) async fn load(ctx: &mut LoadContext, bytes: &[u8]) -> Result<ParsedMesh> {
    let gltf = ::gltf::Gltf::from_slice(bytes)?;

    let buffers = load_buffers(ctx, &gltf).await?;
    let images = load_images(ctx, &gltf, &buffers).await?;

    let unsupported: Vec<&str> = gltf
        .extensions_required()
        .filter(|ext| !matches!(*ext, "KHR_materials_emissive_strength" | "KHR_texture_transform"))
        .collect();
    if !unsupported.is_empty() {
        ctx.warn(format!("requires unsupported extensions {unsupported:?}; display may be inaccurate"));
    }

    let materials = gltf
        .materials()
        .map(|m| convert_material(&m, &images))
        .collect::<Vec<_>>();

    let mut parts = Vec::new();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(ctx, &node, Affine3A::IDENTITY, &buffers, &mut parts);
            }
        }
        // Scene-less files: every mesh at the origin.
        None => {
            for mesh in gltf.meshes() {
                collect_mesh(ctx, &mesh, Affine3A::IDENTITY, &buffers, &mut parts);
            }
        }
    }

    if parts.iter().all(|p| p.geometry.vertex_count() == 0) {
        return Err(AssetError::EmptyMesh(ctx.source.filename.clone()).into());
    }

    Ok(ParsedMesh {
        format: if gltf.blob.is_some() { MeshFormat::Glb } else { MeshFormat::Gltf },
        parts,
        materials,
        default_material: None,
    })
}

fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(Into::into),
    )
}

async fn load_buffers(ctx: &LoadContext, gltf: &::gltf::Gltf) -> Result<Vec<Vec<u8>>> {
    let fetches = gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            ::gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| parse_error("glTF", "missing GLB binary chunk")),
            ::gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri) {
                Some(decoded) => decoded,
                None => ctx.read_sibling(uri).await,
            },
        }
    });
    try_join_all(fetches).await
}

async fn load_images(ctx: &LoadContext, gltf: &::gltf::Gltf, buffers: &[Vec<u8>]) -> Result<Vec<DecodedImage>> {
    let fetches = gltf.images().map(|image| async move {
        let (bytes, origin) = match image.source() {
            ::gltf::image::Source::View { view, .. } => {
                let data = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
                    .ok_or_else(|| parse_error("glTF", "image buffer view out of range"))?;
                (data.to_vec(), TextureOrigin::Embedded)
            }
            ::gltf::image::Source::Uri { uri, .. } => match decode_data_uri(uri) {
                Some(decoded) => (decoded?, TextureOrigin::Embedded),
                None => (ctx.read_sibling(uri).await?, TextureOrigin::Uri(uri.to_string())),
            },
        };

        let rgba = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok::<_, crate::errors::Error>(DecodedImage {
            name: image.name().map_or_else(|| format!("image_{}", image.index()), str::to_string),
            width,
            height,
            pixels: Arc::new(rgba.into_raw()),
            origin,
        })
    });
    try_join_all(fetches).await
}

fn convert_sampler(sampler: &::gltf::texture::Sampler) -> TextureSampler {
    use ::gltf::texture::{MagFilter, MinFilter, WrappingMode};

    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => AddressMode::MirrorRepeat,
        WrappingMode::Repeat => AddressMode::Repeat,
    };

    TextureSampler {
        address_mode_u: wrap(sampler.wrap_s()),
        address_mode_v: wrap(sampler.wrap_t()),
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => FilterMode::Nearest,
            _ => FilterMode::Linear,
        },
        min_filter: match sampler.min_filter() {
            Some(MinFilter::Nearest | MinFilter::NearestMipmapNearest | MinFilter::NearestMipmapLinear) => {
                FilterMode::Nearest
            }
            _ => FilterMode::Linear,
        },
    }
}

/// Creates a texture resource for one material slot.
fn make_texture(texture: &::gltf::Texture, images: &[DecodedImage], srgb: bool) -> Option<Texture> {
    let image = images.get(texture.source().index())?;
    Some(Texture {
        uuid: uuid::Uuid::new_v4(),
        name: texture.name().map_or_else(|| image.name.clone(), str::to_string),
        width: image.width,
        height: image.height,
        format: if srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        },
        data: Arc::clone(&image.pixels),
        sampler: convert_sampler(&texture.sampler()),
        origin: image.origin.clone(),
    })
}

fn convert_material(material: &::gltf::Material, images: &[DecodedImage]) -> Material {
    let pbr = material.pbr_metallic_roughness();

    let mut mat = StandardMaterial::new(Vec4::from_array(pbr.base_color_factor()))
        .with_pbr(pbr.metallic_factor(), pbr.roughness_factor());
    mat.emissive = Vec3::from_array(material.emissive_factor());
    if let Some(strength) = material.emissive_strength() {
        mat.emissive_intensity = strength;
    }

    mat.map = pbr
        .base_color_texture()
        .and_then(|info| make_texture(&info.texture(), images, true));
    mat.roughness_map = pbr
        .metallic_roughness_texture()
        .and_then(|info| make_texture(&info.texture(), images, false));
    if let Some(normal) = material.normal_texture() {
        mat.normal_map = make_texture(&normal.texture(), images, false);
        mat.normal_scale = normal.scale();
    }
    if let Some(occlusion) = material.occlusion_texture() {
        mat.ao_map = make_texture(&occlusion.texture(), images, false);
        mat.ao_strength = occlusion.strength();
    }
    mat.emissive_map = material
        .emissive_texture()
        .and_then(|info| make_texture(&info.texture(), images, true));

    let transparent = matches!(material.alpha_mode(), ::gltf::material::AlphaMode::Blend);
    let settings = MaterialSettings {
        transparent,
        opacity: mat.color.w,
        depth_write: !transparent,
        side: if material.double_sided() { Side::Double } else { Side::Front },
        ..MaterialSettings::default()
    };

    let name = material
        .name()
        .map_or_else(|| format!("material_{}", material.index().unwrap_or(0)), str::to_string);
    Material::new(MaterialVariant::Standard(mat))
        .with_name(name)
        .with_settings(settings)
}

fn collect_node(
    ctx: &mut LoadContext,
    node: &::gltf::Node,
    parent: Affine3A,
    buffers: &[Vec<u8>],
    parts: &mut Vec<ParsedPart>,
) {
    let local = Affine3A::from_mat4(Mat4::from_cols_array_2d(&node.transform().matrix()));
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        collect_mesh(ctx, &mesh, world, buffers, parts);
    }
    for child in node.children() {
        collect_node(ctx, &child, world, buffers, parts);
    }
}

fn collect_mesh(
    ctx: &mut LoadContext,
    mesh: &::gltf::Mesh,
    transform: Affine3A,
    buffers: &[Vec<u8>],
    parts: &mut Vec<ParsedPart>,
) {
    let base_name = mesh
        .name()
        .map_or_else(|| format!("mesh_{}", mesh.index()), str::to_string);
    let primitive_count = mesh.primitives().len();

    for primitive in mesh.primitives() {
        let topology = match primitive.mode() {
            ::gltf::mesh::Mode::Triangles => PrimitiveTopology::TriangleList,
            ::gltf::mesh::Mode::Points => PrimitiveTopology::PointList,
            other => {
                ctx.warn(format!("skipping primitive in '{base_name}' with unsupported mode {other:?}"));
                continue;
            }
        };

        let Some(mut geometry) = read_primitive(&primitive, buffers) else {
            ctx.warn(format!("primitive {} of '{base_name}' has no positions", primitive.index()));
            continue;
        };
        geometry.topology = topology;

        let name = if primitive_count > 1 {
            format!("{base_name}_{}", primitive.index())
        } else {
            base_name.clone()
        };

        let mut part = ParsedPart::new(name, geometry);
        part.material = primitive.material().index();
        part.transform = transform;
        parts.push(part);
    }
}

fn read_primitive(primitive: &::gltf::Primitive, buffers: &[Vec<u8>]) -> Option<Geometry> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }

    let mut geometry = Geometry::new();
    geometry.set_attribute(attr::POSITION, Attribute::new_planar(&positions, VertexFormat::Float32x3));

    if let Some(iter) = reader.read_normals() {
        let normals: Vec<[f32; 3]> = iter.collect();
        geometry.set_attribute(attr::NORMAL, Attribute::new_planar(&normals, VertexFormat::Float32x3));
    }
    if let Some(iter) = reader.read_tex_coords(0) {
        let uvs: Vec<[f32; 2]> = iter.into_f32().collect();
        geometry.set_attribute(attr::UV, Attribute::new_planar(&uvs, VertexFormat::Float32x2));
    }
    if let Some(iter) = reader.read_colors(0) {
        let colors: Vec<[f32; 4]> = iter.into_rgba_f32().collect();
        geometry.set_attribute(attr::COLOR, Attribute::new_planar(&colors, VertexFormat::Float32x4));
    }
    if let Some(iter) = reader.read_indices() {
        let indices: Vec<u32> = iter.into_u32().collect();
        geometry.set_indices_u32(&indices);
    }

    geometry.compute_bounding_volume();
    Some(geometry)
}

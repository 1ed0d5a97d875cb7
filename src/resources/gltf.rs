//! glTF 2.0 scenes (`.gltf` and `.glb`) via the gltf crate.

use std::{collections::HashMap, path::Path};

use crate::{
    data_structures::{
        scene_graph::{BoneInfluence, RawMaterial, RawMesh, RawNode, RawScene, SceneSource},
        texture::TextureKind,
    },
    error::ImportError,
    options::ImportOptions,
    resources::mesh::compute_tangent_frames,
};

/// Parses glTF files.
///
/// Every primitive becomes its own raw mesh. Base colour textures are diffuse maps and
/// normal textures are normal maps; images stored in buffer views are exposed as
/// embedded `*N` references.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSource;

impl SceneSource for GltfSource {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<RawScene, ImportError> {
        let fail = |reason: String| ImportError::ImportFailed(path.to_path_buf(), reason);
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| fail(e.to_string()))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| fail(e.to_string()))?;

        let mut scene = RawScene::default();
        scene.materials = document.materials().map(to_raw_material).collect();
        let default_material = scene.materials.len();
        scene.materials.push(RawMaterial::new("default"));
        scene.embedded = embedded_images(&document, &buffers);

        // glTF mesh index -> raw meshes of its primitives
        let mut primitive_meshes: HashMap<usize, Vec<usize>> = HashMap::new();
        for mesh in document.meshes() {
            let name = mesh.name().unwrap_or("unnamed").to_string();
            for primitive in mesh.primitives() {
                let Some(raw) = to_raw_mesh(&name, &primitive, &buffers, options) else {
                    log::debug!("Skipping non-triangle primitive {} of mesh {}", primitive.index(), name);
                    continue;
                };
                let raw = RawMesh {
                    material_index: primitive.material().index().unwrap_or(default_material),
                    ..raw
                };
                primitive_meshes
                    .entry(mesh.index())
                    .or_default()
                    .push(scene.meshes.len());
                scene.meshes.push(raw);
            }
        }

        let gltf_scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        scene.root = gltf_scene.map(|s| {
            let mut roots: Vec<RawNode> = s
                .nodes()
                .map(|node| to_raw_node(node, &primitive_meshes))
                .collect();
            if roots.len() == 1 {
                roots.remove(0)
            } else {
                RawNode {
                    name: s.name().unwrap_or("root").to_string(),
                    meshes: Vec::new(),
                    children: roots,
                }
            }
        });
        scene.incomplete = scene.meshes.is_empty();
        Ok(scene)
    }
}

fn to_raw_node(node: gltf::Node, primitive_meshes: &HashMap<usize, Vec<usize>>) -> RawNode {
    let meshes = node
        .mesh()
        .and_then(|mesh| primitive_meshes.get(&mesh.index()))
        .cloned()
        .unwrap_or_default();
    RawNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index())),
        meshes,
        children: node
            .children()
            .map(|child| to_raw_node(child, primitive_meshes))
            .collect(),
    }
}

fn texture_reference(texture: gltf::Texture) -> Option<String> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::View { .. } => Some(RawScene::embedded_key(image.index())),
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!("Image {} uses a data URI, which is not supported", image.index());
            None
        }
        gltf::image::Source::Uri { uri, .. } => Some(decode_uri(uri)),
    }
}

/// Image URIs are percent-encoded; material paths are plain file paths.
fn decode_uri(uri: &str) -> String {
    match urlencoding::decode(uri) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            log::warn!("Image URI {} is not valid UTF-8 once decoded: {}", uri, e);
            uri.to_string()
        }
    }
}

fn to_raw_material(material: gltf::Material) -> RawMaterial {
    let mut raw = RawMaterial::new(material.name().unwrap_or("unnamed"));
    if let Some(path) = material
        .pbr_metallic_roughness()
        .base_color_texture()
        .and_then(|info| texture_reference(info.texture()))
    {
        raw.textures.push((TextureKind::Diffuse, path));
    }
    if let Some(path) = material
        .normal_texture()
        .and_then(|normal| texture_reference(normal.texture()))
    {
        raw.textures.push((TextureKind::Normal, path));
    }
    raw
}

fn embedded_images(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> HashMap<String, Vec<u8>> {
    document
        .images()
        .filter_map(|image| match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = buffers.get(view.buffer().index())?;
                let bytes = buffer.get(view.offset()..view.offset() + view.length())?;
                Some((RawScene::embedded_key(image.index()), bytes.to_vec()))
            }
            gltf::image::Source::Uri { .. } => None,
        })
        .collect()
}

fn triangulate(mode: gltf::mesh::Mode, indices: &[u32]) -> Option<Vec<[u32; 3]>> {
    use gltf::mesh::Mode;
    let faces = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|f| [f[0], f[1], f[2]])
            .collect(),
        // Alternate winding so every strip triangle keeps the same orientation
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| match i % 2 {
                0 => [w[0], w[1], w[2]],
                _ => [w[1], w[0], w[2]],
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&center, rest)) => rest.windows(2).map(|w| [center, w[0], w[1]]).collect(),
            None => Vec::new(),
        },
        _ => return None,
    };
    Some(faces)
}

fn to_raw_mesh(
    name: &str,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    options: &ImportOptions,
) -> Option<RawMesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let tex_coords: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| {
        tc.into_f32()
            .map(|[u, v]| if options.flip_uvs { [u, 1.0 - v] } else { [u, v] })
            .collect()
    });
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let faces = triangulate(primitive.mode(), &indices)?;

    let (tangents, bitangents) = match (&tex_coords, reader.read_tangents()) {
        (Some(_), Some(tangent_attribute)) => {
            // GLTF represents tangents as vec4 where the 4th elem can be used to calculate the bitangent
            let mut tangents = Vec::with_capacity(positions.len());
            let mut bitangents = Vec::with_capacity(positions.len());
            for (i, tangent) in tangent_attribute.enumerate() {
                let tangent: cgmath::Vector4<f32> = tangent.into();
                let normal: cgmath::Vector3<f32> = normals
                    .as_ref()
                    .and_then(|n| n.get(i))
                    .copied()
                    .unwrap_or_default()
                    .into();
                let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                tangents.push(tangent.truncate().into());
                bitangents.push(bitangent.into());
            }
            (Some(tangents), Some(bitangents))
        }
        (Some(uvs), None) => {
            let (tangents, bitangents) = compute_tangent_frames(&positions, uvs, &faces);
            (Some(tangents), Some(bitangents))
        }
        (None, _) => (None, None),
    };

    let bones = match (reader.read_joints(0), reader.read_weights(0)) {
        (Some(joints), Some(weights)) => Some(
            joints
                .into_u16()
                .zip(weights.into_f32())
                .map(|(ids, weights)| BoneInfluence {
                    ids: ids.map(i32::from),
                    weights,
                })
                .collect(),
        ),
        _ => None,
    };

    Some(RawMesh {
        name: name.to_string(),
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        bones,
        faces,
        material_index: 0,
    })
}

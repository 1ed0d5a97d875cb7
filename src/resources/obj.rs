//! Wavefront OBJ/MTL scenes via tobj.

use std::path::Path;

use crate::{
    data_structures::{
        scene_graph::{RawMaterial, RawMesh, RawNode, RawScene, SceneSource},
        texture::TextureKind,
    },
    error::ImportError,
    options::ImportOptions,
    resources::mesh::compute_tangent_frames,
};

/// Parses `.obj` files and the `.mtl` libraries they reference.
///
/// The scene is a root node with one child per OBJ object. Material maps follow the
/// usual OBJ convention: `map_Kd` diffuse, `map_Ks` specular, `map_Bump` normal and
/// `map_Ka` height.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjSource;

impl SceneSource for ObjSource {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<RawScene, ImportError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| ImportError::ImportFailed(path.to_path_buf(), e.to_string()))?;

        let mut materials: Vec<RawMaterial> = match materials {
            Ok(materials) => materials.into_iter().map(to_raw_material).collect(),
            Err(e) => {
                log::warn!("Material library for {} could not be loaded: {}", path.display(), e);
                Vec::new()
            }
        };
        let default_material = materials.len();

        let mut root = RawNode::new(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let mut meshes = Vec::with_capacity(models.len());
        let mut needs_default = false;
        for model in models {
            let material_index = match model.mesh.material_id {
                Some(id) if id < default_material => id,
                _ => {
                    needs_default = true;
                    default_material
                }
            };
            root.children
                .push(RawNode::new(model.name.clone()).with_meshes([meshes.len()]));
            meshes.push(to_raw_mesh(model, material_index, options));
        }
        if needs_default {
            materials.push(RawMaterial::new("default"));
        }

        log::debug!(
            "OBJ {}: {} meshes, {} materials",
            path.display(),
            meshes.len(),
            materials.len()
        );
        Ok(RawScene {
            incomplete: meshes.is_empty(),
            root: Some(root),
            meshes,
            materials,
            embedded: Default::default(),
        })
    }
}

fn to_raw_material(material: tobj::Material) -> RawMaterial {
    let mut raw = RawMaterial::new(material.name);
    let maps = [
        (TextureKind::Diffuse, material.diffuse_texture),
        (TextureKind::Specular, material.specular_texture),
        (TextureKind::Normal, material.normal_texture),
        (TextureKind::Height, material.ambient_texture),
    ];
    for (kind, texture) in maps {
        if let Some(texture) = texture.filter(|t| !t.is_empty()) {
            raw.textures.push((kind, texture));
        }
    }
    raw
}

fn to_raw_mesh(model: tobj::Model, material_index: usize, options: &ImportOptions) -> RawMesh {
    let mesh = model.mesh;
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = (!mesh.normals.is_empty()).then(|| {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect::<Vec<_>>()
    });
    let tex_coords = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| match options.flip_uvs {
                true => [t[0], 1.0 - t[1]],
                false => [t[0], t[1]],
            })
            .collect::<Vec<_>>()
    });
    let faces: Vec<[u32; 3]> = mesh
        .indices
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();

    let (tangents, bitangents) = match &tex_coords {
        Some(uvs) => {
            let (tangents, bitangents) = compute_tangent_frames(&positions, uvs, &faces);
            (Some(tangents), Some(bitangents))
        }
        None => (None, None),
    };

    RawMesh {
        name: model.name,
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        bones: None,
        faces,
        material_index,
    }
}

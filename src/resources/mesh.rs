use crate::{
    context::GpuContext,
    data_structures::{
        mesh::{Mesh, check_indices},
        scene_graph::{RawMaterial, RawMesh},
        vertex::Vertex,
    },
    error::ImportError,
    resources::texture::{MaterialBinder, TextureCache},
};

/// Turn one parsed mesh into an uploaded [`Mesh`].
///
/// Normals default to zero when the mesh has none. Texture coordinates come from the
/// first UV channel; without one, texture coordinates, tangents and bitangents all stay
/// zero and no textures are bound. Faces are flattened in order. Textures are resolved
/// for `material` in the fixed order diffuse, specular, normal, height.
pub fn build_mesh<G: GpuContext>(
    raw: &RawMesh,
    material: Option<&RawMaterial>,
    binder: &MaterialBinder<'_>,
    cache: &mut TextureCache,
    gpu: &mut G,
) -> Result<Mesh, ImportError> {
    let vertices = build_vertices(raw)?;
    let indices = flatten_faces(raw)?;
    // Validate before any texture reaches the cache
    check_indices(&indices, vertices.len())?;
    let textures = match material {
        Some(material) if raw.tex_coords.is_some() => binder.resolve_all(material, cache, gpu),
        Some(material) if !material.textures.is_empty() => {
            log::debug!("Mesh {} has no texture coordinates, not binding {}", raw.name, material.name);
            Vec::new()
        }
        _ => Vec::new(),
    };
    Mesh::new(raw.name.clone(), vertices, indices, textures, gpu)
}

pub(crate) fn build_vertices(raw: &RawMesh) -> Result<Vec<Vertex>, ImportError> {
    let count = raw.positions.len();
    let mut vertices = Vec::new();
    vertices
        .try_reserve_exact(count)
        .map_err(|_| ImportError::Allocation("vertices", count))?;

    let tangent_frame = match (&raw.tex_coords, &raw.tangents, &raw.bitangents) {
        (Some(_), Some(tangents), Some(bitangents)) => Some((tangents, bitangents)),
        (Some(_), _, _) => {
            log::warn!(
                "Mesh {} has texture coordinates but no tangent frame, using zero tangents",
                raw.name
            );
            None
        }
        _ => None,
    };

    for (i, &position) in raw.positions.iter().enumerate() {
        let mut vertex = Vertex {
            position,
            ..Default::default()
        };
        if let Some(normal) = raw.normals.as_ref().and_then(|n| n.get(i)) {
            vertex.normal = *normal;
        }
        if let Some(tex_coords) = raw.tex_coords.as_ref().and_then(|t| t.get(i)) {
            vertex.tex_coords = *tex_coords;
            if let Some((tangents, bitangents)) = tangent_frame {
                vertex.tangent = tangents.get(i).copied().unwrap_or_default();
                vertex.bitangent = bitangents.get(i).copied().unwrap_or_default();
            }
        }
        if let Some(bone) = raw.bones.as_ref().and_then(|b| b.get(i)) {
            vertex.bone_ids = bone.ids;
            vertex.bone_weights = bone.weights;
        }
        vertices.push(vertex);
    }
    Ok(vertices)
}

fn flatten_faces(raw: &RawMesh) -> Result<Vec<u32>, ImportError> {
    let count = raw.faces.len() * 3;
    let mut indices = Vec::new();
    indices
        .try_reserve_exact(count)
        .map_err(|_| ImportError::Allocation("indices", count))?;
    indices.extend(raw.faces.iter().flatten());
    Ok(indices)
}

/**
 * Some formats (OBJ, glTF without TANGENT) don't come with tangents and bitangents so they
 * have to be calculated for normal maps to work correctly.
 *
 * Every triangle contributes the same tangent/bitangent to its three vertices; the sums
 * are averaged afterwards. Triangles with degenerate UVs contribute nothing.
 */
pub(crate) fn compute_tangent_frames(
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    faces: &[[u32; 3]],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let zero = cgmath::Vector3::new(0.0f32, 0.0, 0.0);
    let mut tangents = vec![zero; positions.len()];
    let mut bitangents = vec![zero; positions.len()];
    let mut triangles_included = vec![0u32; positions.len()];

    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        let (Some(&p0), Some(&p1), Some(&p2)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let (Some(&uv0), Some(&uv1), Some(&uv2)) = (tex_coords.get(a), tex_coords.get(b), tex_coords.get(c))
        else {
            continue;
        };
        let pos0: cgmath::Vector3<f32> = p0.into();
        let pos1: cgmath::Vector3<f32> = p1.into();
        let pos2: cgmath::Vector3<f32> = p2.into();
        let uv0: cgmath::Vector2<f32> = uv0.into();
        let uv1: cgmath::Vector2<f32> = uv1.into();
        let uv2: cgmath::Vector2<f32> = uv2.into();

        // Edges of the triangle in model space and in UV space
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;

        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            triangles_included[i] += 1;
        }
    }

    // Average the tangents/bitangents
    let average = |sums: Vec<cgmath::Vector3<f32>>| {
        sums.into_iter()
            .zip(&triangles_included)
            .map(|(sum, &n)| match n {
                0 => [0.0; 3],
                n => (sum / n as f32).into(),
            })
            .collect::<Vec<[f32; 3]>>()
    };
    (average(tangents), average(bitangents))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        data_structures::{scene_graph::BoneInfluence, texture::TextureKind},
        headless::HeadlessContext,
        options::ImportOptions,
    };

    fn quad() -> RawMesh {
        RawMesh {
            name: "quad".into(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2], [0, 2, 3]],
            ..Default::default()
        }
    }

    #[test]
    fn missing_uvs_leave_zero_tangent_frame() {
        let mut raw = quad();
        raw.normals = Some(vec![[0.0, 0.0, 1.0]; 4]);
        raw.tangents = Some(vec![[1.0, 0.0, 0.0]; 4]);
        raw.bitangents = Some(vec![[0.0, 1.0, 0.0]; 4]);

        let vertices = build_vertices(&raw).unwrap();
        assert_eq!(vertices.len(), 4);
        for v in &vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
            assert_eq!(v.tex_coords, [0.0, 0.0]);
            assert!(!v.has_tangent_frame());
        }
    }

    #[test]
    fn uvs_bring_their_tangent_frame() {
        let mut raw = quad();
        raw.tex_coords = Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        raw.tangents = Some(vec![[1.0, 0.0, 0.0]; 4]);
        raw.bitangents = Some(vec![[0.0, 1.0, 0.0]; 4]);
        raw.bones = Some(vec![
            BoneInfluence {
                ids: [3, 1, 0, 0],
                weights: [0.75, 0.25, 0.0, 0.0],
            };
            4
        ]);

        let vertices = build_vertices(&raw).unwrap();
        assert_eq!(vertices[2].tex_coords, [1.0, 1.0]);
        assert_eq!(vertices[2].tangent, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[2].bitangent, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[2].bone_ids, [3, 1, 0, 0]);
        // normals absent
        assert_eq!(vertices[2].normal, [0.0; 3]);
    }

    #[test]
    fn uvs_without_tangents_default_to_zero() {
        let mut raw = quad();
        raw.tex_coords = Some(vec![[0.5, 0.5]; 4]);
        let vertices = build_vertices(&raw).unwrap();
        assert_eq!(vertices[0].tex_coords, [0.5, 0.5]);
        assert!(!vertices[0].has_tangent_frame());
    }

    #[test]
    fn computed_tangents_follow_uv_axes() {
        let raw = quad();
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let (tangents, bitangents) = compute_tangent_frames(&raw.positions, &uvs, &raw.faces);
        for (t, b) in tangents.iter().zip(&bitangents) {
            assert!((t[0] - 1.0).abs() < 1e-6 && t[1].abs() < 1e-6);
            assert!((b[1] - 1.0).abs() < 1e-6 && b[0].abs() < 1e-6);
        }
    }

    #[test]
    fn rejected_mesh_leaves_no_textures_behind() {
        let mut bytes = Vec::new();
        image::RgbaImage::new(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let embedded = HashMap::from([("*0".to_string(), bytes)]);
        let options = ImportOptions::default();
        let binder = MaterialBinder::new("", &embedded, &options);
        let material = RawMaterial::new("m").with_texture(TextureKind::Diffuse, "*0");
        let mut cache = TextureCache::new();
        let mut gpu = HeadlessContext::new();

        let mut raw = quad();
        raw.tex_coords = Some(vec![[0.0, 0.0]; 4]);
        raw.faces.push([0, 2, 4]);
        let result = build_mesh(&raw, Some(&material), &binder, &mut cache, &mut gpu);
        assert!(matches!(
            result,
            Err(ImportError::IndexOutOfRange { index: 4, vertices: 4 })
        ));
        assert!(cache.is_empty());
        assert_eq!(gpu.texture_uploads(), 0);
        assert_eq!(gpu.mesh_uploads(), 0);
    }

    #[test]
    fn mesh_without_material_has_no_textures() {
        let embedded = HashMap::new();
        let options = ImportOptions::default();
        let binder = MaterialBinder::new("", &embedded, &options);
        let mut cache = TextureCache::new();
        let mut gpu = HeadlessContext::new();

        let mesh = build_mesh(&quad(), None, &binder, &mut cache, &mut gpu).unwrap();
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.num_textures(), 0);
        assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.num_vertices()));

        let material = RawMaterial::new("missing").with_texture(TextureKind::Diffuse, "gone.png");
        let mesh = build_mesh(&quad(), Some(&material), &binder, &mut cache, &mut gpu).unwrap();
        assert_eq!(mesh.num_textures(), 0);
        assert_eq!(gpu.mesh_uploads(), 2);
    }
}

//! Scene graph as delivered by a scene parser.
//!
//! Parsers (see [`crate::resources::obj`] and [`crate::resources::gltf`]) turn a file
//! into a [`RawScene`]: a tree of nodes referencing meshes by index, the raw mesh
//! attribute arrays, and materials listing texture references per [`TextureKind`].
//! The importer only ever reads this structure.

use std::{collections::HashMap, path::Path};

use crate::{
    data_structures::{texture::TextureKind, vertex::MAX_BONE_INFLUENCE},
    error::ImportError,
    options::ImportOptions,
};

/// Bone indices and weights of one vertex, carried through untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoneInfluence {
    pub ids: [i32; MAX_BONE_INFLUENCE],
    pub weights: [f32; MAX_BONE_INFLUENCE],
}

/// Attribute arrays of one parsed mesh. Optional arrays are `None` when the file lacks them.
#[derive(Clone, Debug, Default)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// First UV channel.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub bones: Option<Vec<BoneInfluence>>,
    /// Triangulated faces, each listing three vertex indices.
    pub faces: Vec<[u32; 3]>,
    pub material_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RawMaterial {
    pub name: String,
    /// Texture references in the material's own storage order.
    pub textures: Vec<(TextureKind, String)>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, kind: TextureKind, path: impl Into<String>) -> Self {
        self.textures.push((kind, path.into()));
        self
    }

    /// Paths of every texture of `kind`, in storage order.
    pub fn textures_of(&self, kind: TextureKind) -> impl Iterator<Item = &str> {
        self.textures
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, path)| path.as_str())
    }

    pub fn texture_count(&self, kind: TextureKind) -> usize {
        self.textures_of(kind).count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RawNode {
    pub name: String,
    /// Indices into [`RawScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: RawNode) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct RawScene {
    pub root: Option<RawNode>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    /// Encoded images stored inside the scene file, keyed `*<index>`.
    pub embedded: HashMap<String, Vec<u8>>,
    /// Set by the parser when the scene could not be read in full.
    pub incomplete: bool,
}

impl RawScene {
    /// Key under which an embedded image is referenced by materials.
    pub fn embedded_key(index: usize) -> String {
        format!("*{index}")
    }
}

/// Parses a scene file into a [`RawScene`].
///
/// Implementations always triangulate and honour [`ImportOptions::flip_uvs`].
pub trait SceneSource {
    fn parse(&self, path: &Path, options: &ImportOptions) -> Result<RawScene, ImportError>;
}

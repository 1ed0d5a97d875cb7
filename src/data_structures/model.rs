//! The aggregate produced by one import.

use crate::{
    context::GpuContext,
    data_structures::mesh::Mesh,
    error::ImportError,
    options::ImportOptions,
    render::ShadingStage,
    resources::{self, texture::TextureCache},
};

/// Meshes in scene traversal order plus the texture cache they share.
///
/// A model is filled during a single import call and is read-only afterwards.
/// [`Model::destroy`] releases every mesh buffer and every cached texture once.
#[derive(Debug, Default)]
pub struct Model {
    meshes: Vec<Mesh>,
    textures: TextureCache,
    directory: String,
}

impl Model {
    /// A model with no meshes and no textures, as returned by a failed import.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with_directory(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Import `path` with default options. See [`resources::load_model`].
    pub fn load<G: GpuContext>(path: &str, gpu: &mut G) -> Result<Self, ImportError> {
        resources::load_model(path, &ImportOptions::default(), gpu)
    }

    /// Import `path` with default options, logging failures. See [`resources::import_model`].
    pub fn import<G: GpuContext>(path: &str, gpu: &mut G) -> Self {
        resources::import_model(path, &ImportOptions::default(), gpu)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Directory relative texture paths were resolved against.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Mesh>, &mut TextureCache) {
        (&mut self.meshes, &mut self.textures)
    }

    /// Draw every mesh in traversal order.
    pub fn draw(&self, stage: &mut impl ShadingStage) {
        for mesh in &self.meshes {
            mesh.draw(stage);
        }
    }

    pub fn destroy<G: GpuContext>(self, gpu: &mut G) {
        for mesh in self.meshes {
            mesh.destroy(gpu);
        }
        self.textures.release(gpu);
    }
}

//! Renderer-ready meshes.

use crate::{
    context::{GpuContext, MeshBuffers, TextureHandle},
    data_structures::{
        texture::{SlotNamer, Texture},
        vertex::Vertex,
    },
    error::ImportError,
    render::ShadingStage,
};

/// One texture binding as reported to the shading stage during a draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotBinding {
    pub name: String,
    pub unit: u32,
    pub texture: TextureHandle,
}

/// Geometry plus bound textures, uploaded once at construction.
///
/// A mesh exclusively owns its vertex, index and texture sequences and its GPU
/// buffers. The buffers are freed by [`Mesh::destroy`], which consumes the mesh so
/// it cannot run twice.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    textures: Vec<Texture>,
    buffers: MeshBuffers,
}

impl Mesh {
    /// Validate the geometry and upload it.
    ///
    /// Every index must address an existing vertex; otherwise nothing is uploaded.
    pub fn new<G: GpuContext>(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        textures: Vec<Texture>,
        gpu: &mut G,
    ) -> Result<Self, ImportError> {
        check_indices(&indices, vertices.len())?;
        let name = name.into();
        let buffers = gpu.upload_mesh(&vertices, &indices, &name);
        Ok(Self {
            name,
            vertices,
            indices,
            textures,
            buffers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn buffers(&self) -> MeshBuffers {
        self.buffers
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    pub fn num_textures(&self) -> usize {
        self.textures.len()
    }

    /// The slot bindings one draw of this mesh reports, in texture unit order.
    ///
    /// Numbering restarts at 1 for every call.
    pub fn bindings(&self) -> Vec<SlotBinding> {
        let mut namer = SlotNamer::new();
        self.textures
            .iter()
            .enumerate()
            .map(|(unit, texture)| SlotBinding {
                name: namer.next_name(texture.kind),
                unit: unit as u32,
                texture: texture.handle,
            })
            .collect()
    }

    /// Bind every texture to its own unit, draw, then reset the active unit to 0.
    pub fn draw(&self, stage: &mut impl ShadingStage) {
        for binding in self.bindings() {
            stage.set_active_unit(binding.unit);
            stage.set_sampler_slot(&binding.name, binding.unit);
            stage.bind_texture(binding.texture);
        }
        stage.draw_indexed(self.buffers, self.indices.len() as u32);
        stage.set_active_unit(0);
    }

    /// Free the GPU buffers. Texture handles belong to the model's cache and are left alone.
    pub fn destroy<G: GpuContext>(self, gpu: &mut G) {
        gpu.release_mesh(self.buffers);
    }
}

/// Fails with [`ImportError::IndexOutOfRange`] on the first index past `vertex_count`.
pub(crate) fn check_indices(indices: &[u32], vertex_count: usize) -> Result<(), ImportError> {
    match indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(ImportError::IndexOutOfRange {
            index,
            vertices: vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::texture::TextureKind,
        headless::HeadlessContext,
        render::{BindingRecorder, StageCall},
    };

    fn texture(id: u32, kind: TextureKind) -> Texture {
        Texture {
            handle: TextureHandle(id),
            kind,
            path: format!("{id}.png"),
        }
    }

    fn triangle() -> Vec<Vertex> {
        vec![Vertex::default(); 3]
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let mut gpu = HeadlessContext::new();
        let result = Mesh::new("bad", triangle(), vec![0, 1, 3], Vec::new(), &mut gpu);
        assert!(matches!(
            result,
            Err(ImportError::IndexOutOfRange { index: 3, vertices: 3 })
        ));
        assert_eq!(gpu.mesh_uploads(), 0);
    }

    #[test]
    fn draw_binds_units_in_texture_order() {
        let mut gpu = HeadlessContext::new();
        let textures = vec![
            texture(7, TextureKind::Diffuse),
            texture(8, TextureKind::Diffuse),
            texture(9, TextureKind::Specular),
        ];
        let mesh = Mesh::new("lit", triangle(), vec![0, 1, 2], textures, &mut gpu).unwrap();

        let mut stage = BindingRecorder::new();
        mesh.draw(&mut stage);

        assert_eq!(
            stage.slots(),
            vec![
                ("material.texture_diffuse1".to_string(), 0),
                ("material.texture_diffuse2".to_string(), 1),
                ("material.texture_specular1".to_string(), 2),
            ]
        );
        assert!(stage.calls().contains(&StageCall::BindTexture {
            unit: 2,
            texture: TextureHandle(9)
        }));
        assert_eq!(stage.draws(), vec![(mesh.buffers(), 3)]);
        assert_eq!(stage.calls().last(), Some(&StageCall::ActiveUnit(0)));
    }

    #[test]
    fn numbering_restarts_every_draw() {
        let mut gpu = HeadlessContext::new();
        let textures = vec![texture(1, TextureKind::Normal)];
        let mesh = Mesh::new("n", triangle(), vec![0, 1, 2], textures, &mut gpu).unwrap();

        let mut stage = BindingRecorder::new();
        mesh.draw(&mut stage);
        mesh.draw(&mut stage);
        let names: Vec<_> = stage.slots().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["material.texture_normal1", "material.texture_normal1"]);
    }

    #[test]
    fn destroy_releases_buffers_only() {
        let mut gpu = HeadlessContext::new();
        let mesh = Mesh::new("m", triangle(), vec![0, 1, 2], Vec::new(), &mut gpu).unwrap();
        assert_eq!(gpu.live_buffers(), 2);
        mesh.destroy(&mut gpu);
        assert_eq!(gpu.live_buffers(), 0);
        assert_eq!(gpu.invalid_releases(), 0);
    }
}

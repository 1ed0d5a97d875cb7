//! model-forge
//!
//! Turns 3D scene files into renderer-ready geometry. An import walks the parsed
//! scene graph depth-first, converts every referenced mesh into a fixed vertex
//! layout with a flat index list, and binds each mesh's material textures through
//! a per-model cache so every image is decoded and uploaded at most once. At draw
//! time each mesh reports its textures to a shading stage under stable ordinal
//! slot names (`material.texture_diffuse1`, `material.texture_specular1`, ...).
//!
//! High-level modules
//! - `context`: GPU resource seam (`GpuContext`) and its wgpu implementation
//! - `data_structures`: vertices, textures, meshes, models and parsed scene graphs
//! - `error`: the import error taxonomy
//! - `headless`: an in-memory `GpuContext` for tooling without a GPU
//! - `options`: import configuration
//! - `render`: the shading stage seam and its recorder and wgpu implementations
//! - `resources`: scene parsing (OBJ, glTF), mesh building and texture loading
//!

pub mod context;
pub mod data_structures;
pub mod error;
pub mod headless;
pub mod options;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use context::{GpuContext, WgpuContext};
pub use data_structures::{
    mesh::Mesh,
    model::Model,
    texture::{Texture, TextureKind},
    vertex::Vertex,
};
pub use error::ImportError;
pub use headless::HeadlessContext;
pub use options::ImportOptions;
pub use render::{BindingRecorder, ShadingStage, WgpuStage};
pub use resources::{import_model, load_model};

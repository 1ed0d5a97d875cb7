//! A [`GpuContext`] that keeps uploads in memory instead of on a device.
//!
//! Useful for inspecting what an import would upload without a GPU, and for
//! checking resource lifetimes: every upload and release is counted.

use std::collections::HashMap;

use crate::{
    context::{BufferHandle, GpuContext, HandleAllocator, MeshBuffers, TextureHandle, TextureParams},
    data_structures::{
        texture::{DecodedImage, PixelFormat},
        vertex::Vertex,
    },
};

/// What a texture upload looked like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureUpload {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub srgb: bool,
    pub mip_levels: u32,
}

#[derive(Clone, Debug, PartialEq)]
enum BufferContents {
    Vertices(Vec<Vertex>),
    Indices(Vec<u32>),
}

#[derive(Debug, Default)]
pub struct HeadlessContext {
    textures: HashMap<TextureHandle, TextureUpload>,
    buffers: HashMap<BufferHandle, BufferContents>,
    handles: HandleAllocator,
    texture_uploads: usize,
    mesh_uploads: usize,
    invalid_releases: usize,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureUpload> {
        self.textures.get(&handle)
    }

    pub fn vertices(&self, buffers: MeshBuffers) -> Option<&[Vertex]> {
        match self.buffers.get(&buffers.vertex)? {
            BufferContents::Vertices(vertices) => Some(vertices),
            BufferContents::Indices(_) => None,
        }
    }

    pub fn indices(&self, buffers: MeshBuffers) -> Option<&[u32]> {
        match self.buffers.get(&buffers.index)? {
            BufferContents::Indices(indices) => Some(indices),
            BufferContents::Vertices(_) => None,
        }
    }

    /// Textures uploaded and not yet released.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Buffers uploaded and not yet released. Every mesh owns two.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Total texture uploads over the context's lifetime.
    pub fn texture_uploads(&self) -> usize {
        self.texture_uploads
    }

    pub fn mesh_uploads(&self) -> usize {
        self.mesh_uploads
    }

    /// Releases of handles that were already released or never uploaded.
    pub fn invalid_releases(&self) -> usize {
        self.invalid_releases
    }
}

impl GpuContext for HeadlessContext {
    fn upload_texture(&mut self, image: &DecodedImage, params: &TextureParams) -> TextureHandle {
        let mip_levels = if params.mipmaps {
            image.mip_level_count()
        } else {
            1
        };
        let handle = TextureHandle(self.handles.next());
        self.textures.insert(
            handle,
            TextureUpload {
                label: params.label.clone(),
                width: image.width,
                height: image.height,
                format: image.format,
                srgb: params.srgb,
                mip_levels,
            },
        );
        self.texture_uploads += 1;
        handle
    }

    fn upload_mesh(&mut self, vertices: &[Vertex], indices: &[u32], label: &str) -> MeshBuffers {
        log::debug!("{}: {} vertices, {} indices", label, vertices.len(), indices.len());
        let vertex = BufferHandle(self.handles.next());
        let index = BufferHandle(self.handles.next());
        self.buffers
            .insert(vertex, BufferContents::Vertices(vertices.to_vec()));
        self.buffers
            .insert(index, BufferContents::Indices(indices.to_vec()));
        self.mesh_uploads += 1;
        MeshBuffers { vertex, index }
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_none() {
            log::warn!("Texture {:?} released twice or never uploaded", handle);
            self.invalid_releases += 1;
        }
    }

    fn release_mesh(&mut self, buffers: MeshBuffers) {
        for handle in [buffers.vertex, buffers.index] {
            if self.buffers.remove(&handle).is_none() {
                log::warn!("Buffer {:?} released twice or never uploaded", handle);
                self.invalid_releases += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            width,
            height,
            format: PixelFormat::Rgba,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    #[test]
    fn handles_are_unique_and_non_zero() {
        let mut ctx = HeadlessContext::new();
        let params = TextureParams {
            label: "a".into(),
            srgb: false,
            mipmaps: true,
        };
        let a = ctx.upload_texture(&image(4, 4), &params);
        let b = ctx.upload_texture(&image(4, 4), &params);
        assert_ne!(a, b);
        assert_ne!(a.raw(), 0);
        assert_eq!(ctx.texture(a).map(|t| t.mip_levels), Some(3));
    }

    #[test]
    fn double_release_is_counted() {
        let mut ctx = HeadlessContext::new();
        let buffers = ctx.upload_mesh(&[Vertex::default()], &[0], "m");
        assert_eq!(ctx.live_buffers(), 2);
        ctx.release_mesh(buffers);
        assert_eq!(ctx.live_buffers(), 0);
        ctx.release_mesh(buffers);
        assert_eq!(ctx.invalid_releases(), 2);
    }
}

//! GPU resource ownership.
//!
//! Importing a model allocates GPU textures and geometry buffers through the
//! [`GpuContext`] trait. Everything the rest of the crate keeps is an opaque
//! integer handle; the context owns the actual resources. [`WgpuContext`] is the
//! real implementation on top of a wgpu device and queue.

use std::collections::HashMap;

use anyhow::anyhow;
use wgpu::util::DeviceExt;

use crate::data_structures::{
    texture::{DecodedImage, PixelFormat},
    vertex::Vertex,
};

/// Opaque identifier of an uploaded texture. Never zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque identifier of an uploaded geometry buffer. Never zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u32);

impl BufferHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// The vertex and index buffer pair backing one mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex: BufferHandle,
    pub index: BufferHandle,
}

/// How a decoded image should be stored on the GPU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureParams {
    pub label: String,
    pub srgb: bool,
    pub mipmaps: bool,
}

/// Allocates and frees GPU resources on behalf of meshes and models.
///
/// All calls happen on the thread that owns the graphics context.
pub trait GpuContext {
    fn upload_texture(&mut self, image: &DecodedImage, params: &TextureParams) -> TextureHandle;

    fn upload_mesh(&mut self, vertices: &[Vertex], indices: &[u32], label: &str) -> MeshBuffers;

    fn release_texture(&mut self, handle: TextureHandle);

    fn release_mesh(&mut self, buffers: MeshBuffers);
}

/// Monotonic handle source shared by the context implementations.
#[derive(Debug)]
pub(crate) struct HandleAllocator {
    next: u32,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A texture living on the GPU together with the bind group that exposes it to shaders.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

/// [`GpuContext`] backed by a wgpu device.
#[derive(Debug)]
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    texture_layout: wgpu::BindGroupLayout,
    textures: HashMap<TextureHandle, GpuTexture>,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    handles: HandleAllocator,
}

impl WgpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_layout = texture_layout(&device);
        Self {
            device,
            queue,
            texture_layout,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            handles: HandleAllocator::default(),
        }
    }

    /// Create a context on the default adapter without any window or surface.
    pub fn headless() -> anyhow::Result<Self> {
        futures::executor::block_on(async {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..wgpu::InstanceDescriptor::new_without_display_handle()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| anyhow!("no suitable GPU adapter: {e}"))?;
            log::info!("Using adapter {:?}", adapter.get_info().name);
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("model-forge device"),
                    ..Default::default()
                })
                .await?;
            Ok(Self::new(device, queue))
        })
    }

    /// Layout of the per-texture bind group: binding 0 texture view, binding 1 sampler.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle)
    }

    fn create_texture(&self, image: &DecodedImage, params: &TextureParams) -> GpuTexture {
        let (format, bytes_per_pixel) = match (image.format, params.srgb) {
            (PixelFormat::Red, _) => (wgpu::TextureFormat::R8Unorm, 1),
            (_, true) => (wgpu::TextureFormat::Rgba8UnormSrgb, 4),
            (_, false) => (wgpu::TextureFormat::Rgba8Unorm, 4),
        };
        let mut levels = vec![image.clone()];
        if params.mipmaps {
            levels.extend(image.mip_chain());
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&params.label),
            size,
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            // wgpu has no three channel formats
            let data = match level.format {
                PixelFormat::Red => level.pixels.clone(),
                _ => level.to_rgba(),
            };
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                &data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_pixel * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(&params.label),
        });

        GpuTexture {
            texture,
            view,
            sampler,
            bind_group,
        }
    }
}

impl GpuContext for WgpuContext {
    fn upload_texture(&mut self, image: &DecodedImage, params: &TextureParams) -> TextureHandle {
        let texture = self.create_texture(image, params);
        let handle = TextureHandle(self.handles.next());
        self.textures.insert(handle, texture);
        handle
    }

    fn upload_mesh(&mut self, vertices: &[Vertex], indices: &[u32], label: &str) -> MeshBuffers {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let vertex = BufferHandle(self.handles.next());
        let index = BufferHandle(self.handles.next());
        self.buffers.insert(vertex, vertex_buffer);
        self.buffers.insert(index, index_buffer);
        MeshBuffers { vertex, index }
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        match self.textures.remove(&handle) {
            Some(gpu_texture) => gpu_texture.texture.destroy(),
            None => log::warn!("Texture {:?} released twice or never uploaded", handle),
        }
    }

    fn release_mesh(&mut self, buffers: MeshBuffers) {
        for handle in [buffers.vertex, buffers.index] {
            match self.buffers.remove(&handle) {
                Some(buffer) => buffer.destroy(),
                None => log::warn!("Buffer {:?} released twice or never uploaded", handle),
            }
        }
    }
}

fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Material texture_bind_group_layout"),
    })
}

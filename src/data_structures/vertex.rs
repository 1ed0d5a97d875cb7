//! Renderer-ready vertex layout.

/// Maximum number of bones that may influence a single vertex.
pub const MAX_BONE_INFLUENCE: usize = 4;

/// A single vertex as uploaded to the GPU.
///
/// `tangent` and `bitangent` are only non-zero when the vertex also carries
/// texture coordinates. Bone indices and weights are passed through untouched;
/// nothing in this crate interprets them.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
        4 => Float32x3,
        5 => Sint32x4,
        6 => Float32x4
    ];

    /**
     * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to.
     *
     * Locations: 0 position, 1 normal, 2 tex coords, 3 tangent, 4 bitangent, 5 bone ids, 6 bone weights.
     */
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn has_tangent_frame(&self) -> bool {
        self.tangent != [0.0; 3] || self.bitangent != [0.0; 3]
    }
}

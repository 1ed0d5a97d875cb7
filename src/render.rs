//! The shading stage a mesh draws through.
//!
//! A mesh never talks to a graphics API directly at draw time. It reports each
//! texture binding as `(slot name -> texture unit)` and asks for an indexed draw;
//! the [`ShadingStage`] decides what that means.
//!
//! - [`BindingRecorder`] records every call, handy for tooling and tests
//! - [`WgpuStage`] turns the calls into bind group and draw commands on a `wgpu::RenderPass`

use std::collections::HashMap;

use crate::context::{MeshBuffers, TextureHandle, WgpuContext};

/// Receives texture bindings and draw requests from [`Mesh::draw`](crate::data_structures::mesh::Mesh::draw).
///
/// Implementations mutate shared binding state and must only be driven from the
/// thread that owns the graphics context.
pub trait ShadingStage {
    /// Make `unit` the target of subsequent [`bind_texture`](Self::bind_texture) calls.
    fn set_active_unit(&mut self, unit: u32);

    /// Point the sampler uniform `name` at texture unit `unit`.
    fn set_sampler_slot(&mut self, name: &str, unit: u32);

    /// Attach a texture to the active unit.
    fn bind_texture(&mut self, texture: TextureHandle);

    /// Draw `count` indices from the given buffers as triangles.
    fn draw_indexed(&mut self, buffers: MeshBuffers, count: u32);
}

/// A single call made against a [`BindingRecorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageCall {
    ActiveUnit(u32),
    SamplerSlot { name: String, unit: u32 },
    BindTexture { unit: u32, texture: TextureHandle },
    DrawIndexed { buffers: MeshBuffers, count: u32 },
}

/// [`ShadingStage`] that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct BindingRecorder {
    calls: Vec<StageCall>,
    active_unit: u32,
}

impl BindingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[StageCall] {
        &self.calls
    }

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    /// Every `(slot name, unit)` pair in the order it was reported.
    pub fn slots(&self) -> Vec<(String, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                StageCall::SamplerSlot { name, unit } => Some((name.clone(), *unit)),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<(MeshBuffers, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                StageCall::DrawIndexed { buffers, count } => Some((*buffers, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.active_unit = 0;
    }
}

impl ShadingStage for BindingRecorder {
    fn set_active_unit(&mut self, unit: u32) {
        self.active_unit = unit;
        self.calls.push(StageCall::ActiveUnit(unit));
    }

    fn set_sampler_slot(&mut self, name: &str, unit: u32) {
        self.calls.push(StageCall::SamplerSlot {
            name: name.to_string(),
            unit,
        });
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.calls.push(StageCall::BindTexture {
            unit: self.active_unit,
            texture,
        });
    }

    fn draw_indexed(&mut self, buffers: MeshBuffers, count: u32) {
        self.calls.push(StageCall::DrawIndexed { buffers, count });
    }
}

/// [`ShadingStage`] recording into a wgpu render pass.
///
/// `slots` maps the sampler names a pipeline declares (`material.texture_diffuse1`, ...)
/// to the bind group index its layout expects that texture at. Names the pipeline
/// does not declare are ignored, the same way an unknown uniform location is.
pub struct WgpuStage<'a, 'pass> {
    context: &'a WgpuContext,
    pass: &'a mut wgpu::RenderPass<'pass>,
    slots: &'a HashMap<String, u32>,
    unit_groups: HashMap<u32, u32>,
    active_unit: u32,
}

impl<'a, 'pass> WgpuStage<'a, 'pass> {
    pub fn new(
        context: &'a WgpuContext,
        pass: &'a mut wgpu::RenderPass<'pass>,
        slots: &'a HashMap<String, u32>,
    ) -> Self {
        Self {
            context,
            pass,
            slots,
            unit_groups: HashMap::new(),
            active_unit: 0,
        }
    }
}

impl ShadingStage for WgpuStage<'_, '_> {
    fn set_active_unit(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn set_sampler_slot(&mut self, name: &str, unit: u32) {
        match self.slots.get(name) {
            Some(&group) => {
                self.unit_groups.insert(unit, group);
            }
            None => {
                self.unit_groups.remove(&unit);
                log::trace!("Pipeline declares no slot named {}", name);
            }
        }
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        let Some(&group) = self.unit_groups.get(&self.active_unit) else {
            return;
        };
        match self.context.texture(texture) {
            Some(gpu_texture) => self.pass.set_bind_group(group, &gpu_texture.bind_group, &[]),
            None => log::warn!("Texture {:?} is not resident on this device", texture),
        }
    }

    fn draw_indexed(&mut self, buffers: MeshBuffers, count: u32) {
        let (Some(vertex), Some(index)) = (
            self.context.buffer(buffers.vertex),
            self.context.buffer(buffers.index),
        ) else {
            log::warn!("Mesh buffers {:?} are not resident on this device", buffers);
            return;
        };
        self.pass.set_vertex_buffer(0, vertex.slice(..));
        self.pass
            .set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        self.pass.draw_indexed(0..count, 0, 0..1);
        self.unit_groups.clear();
    }
}

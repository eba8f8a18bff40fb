//! Recording node draws into a wgpu render pass
//!
//! Traversal fills a [`WgpuDrawList`] while holding the scene read lock. The
//! list keeps its own references to every node's buffers, so the lock can be
//! released before the pass is recorded.
//!
//! Per-node data (model matrix and octree height) lives in one dynamic
//! uniform buffer, one aligned slot per draw, bound once with a per-draw
//! offset.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use static_assertions::const_assert_eq;

use super::volume_renderer::VolumeDrawContext;
use crate::scene::GpuMesh;
use crate::volume::VolumeType;

/// Uniform block seen by the vertex shader for one draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct NodeUniform {
    pub model: [[f32; 4]; 4],
    pub height: u32,
    pub _padding: [u32; 3],
}

const_assert_eq!(std::mem::size_of::<NodeUniform>(), 80);

const NODE_UNIFORM_SIZE: u64 = std::mem::size_of::<NodeUniform>() as u64;

/// One indexed draw, fully resolved to GPU handles.
pub struct NodeDraw {
    pub vertex_buffer: Arc<wgpu::Buffer>,
    pub index_buffer: Arc<wgpu::Buffer>,
    pub index_count: u32,
    pub uniform_slot: u32,
}

pub struct WgpuDrawList {
    volume_type: Option<VolumeType>,
    draws: Vec<NodeDraw>,
    uniforms: Vec<NodeUniform>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u32,
    capacity: usize,
}

impl WgpuDrawList {
    /// Layout of the per-node bind group, binding 0 with a dynamic offset.
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Node Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(NODE_UNIFORM_SIZE),
                },
                count: None,
            }],
        })
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, initial_capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let stride = align_up(NODE_UNIFORM_SIZE as u32, alignment);
        let capacity = initial_capacity.max(1);
        let uniform_buffer = create_uniform_buffer(device, capacity, stride);
        let bind_group = create_bind_group(device, layout, &uniform_buffer);

        Self {
            volume_type: None,
            draws: Vec::with_capacity(capacity),
            uniforms: Vec::with_capacity(capacity),
            uniform_buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Volume type of the draws currently held, selects the pipeline.
    pub fn volume_type(&self) -> Option<VolumeType> {
        self.volume_type
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Write the per-node uniforms, growing the buffer if needed. Must run
    /// before [`WgpuDrawList::record`] each frame.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) {
        if self.uniforms.is_empty() {
            return;
        }
        if self.uniforms.len() > self.capacity {
            let mut capacity = self.capacity;
            while capacity < self.uniforms.len() {
                capacity *= 2;
            }
            log::debug!(
                "[WgpuDrawList::upload] Growing node uniforms {} -> {}",
                self.capacity,
                capacity
            );
            self.uniform_buffer = create_uniform_buffer(device, capacity, self.stride);
            self.bind_group = create_bind_group(device, layout, &self.uniform_buffer);
            self.capacity = capacity;
        }

        let stride = self.stride as usize;
        let mut data = vec![0u8; self.uniforms.len() * stride];
        for (slot, uniform) in self.uniforms.iter().enumerate() {
            let offset = slot * stride;
            data[offset..offset + NODE_UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(uniform));
        }
        queue.write_buffer(&self.uniform_buffer, 0, &data);
    }

    /// Record every draw. The caller has set the pipeline matching
    /// [`WgpuDrawList::volume_type`] and any camera bind groups.
    pub fn record<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, bind_group_index: u32) {
        for draw in &self.draws {
            pass.set_bind_group(
                bind_group_index,
                &self.bind_group,
                &[draw.uniform_slot * self.stride],
            );
            pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}

impl VolumeDrawContext<wgpu::Buffer> for WgpuDrawList {
    /// Starts a new frame's list for `volume_type`.
    fn begin_volume(&mut self, volume_type: VolumeType) {
        self.volume_type = Some(volume_type);
        self.draws.clear();
        self.uniforms.clear();
    }

    fn draw_node(&mut self, mesh: &GpuMesh<wgpu::Buffer>, model: Mat4, height: u32) {
        let uniform_slot = self.uniforms.len() as u32;
        self.uniforms.push(NodeUniform {
            model: model.to_cols_array_2d(),
            height,
            _padding: [0; 3],
        });
        self.draws.push(NodeDraw {
            vertex_buffer: Arc::clone(&mesh.vertex_buffer),
            index_buffer: Arc::clone(&mesh.index_buffer),
            index_count: mesh.index_count,
            uniform_slot,
        });
    }
}

fn create_uniform_buffer(device: &wgpu::Device, capacity: usize, stride: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Volume Node Uniforms"),
        size: capacity as u64 * stride as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Volume Node Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(NODE_UNIFORM_SIZE),
            }),
        }],
    })
}

/// Round `value` up to a multiple of `alignment` (a power of two).
#[inline]
fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

//! Vertex records produced by the volume engine
//!
//! Both layouts are uploaded verbatim. Decoding of the packed position,
//! normal and material fields happens in the vertex shader.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use super::VolumeType;

/// Colored cubes vertex: position packed into four bytes plus a packed color.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ColoredCubesVertex {
    pub encoded_pos_x: u8,
    pub encoded_pos_y: u8,
    pub encoded_pos_z: u8,
    pub encoded_pos_w: u8,
    pub data: u32,
}

/// Terrain vertex: fixed-point position, encoded normal and eight material weights.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub encoded_pos_x: u16,
    pub encoded_pos_y: u16,
    pub encoded_pos_z: u16,
    pub encoded_normal: u16,
    pub materials: [u8; 8],
}

const_assert_eq!(std::mem::size_of::<ColoredCubesVertex>(), 8);
const_assert_eq!(std::mem::size_of::<TerrainVertex>(), 16);

const COLORED_CUBES_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Uint8x4,
    },
    wgpu::VertexAttribute {
        offset: 4,
        shader_location: 1,
        format: wgpu::VertexFormat::Uint32,
    },
];

const TERRAIN_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Uint16x4,
    },
    wgpu::VertexAttribute {
        offset: 8,
        shader_location: 1,
        format: wgpu::VertexFormat::Unorm8x4,
    },
    wgpu::VertexAttribute {
        offset: 12,
        shader_location: 2,
        format: wgpu::VertexFormat::Unorm8x4,
    },
];

/// Vertex buffer layout for pipelines drawing `volume_type` meshes.
pub fn vertex_buffer_layout(volume_type: VolumeType) -> wgpu::VertexBufferLayout<'static> {
    let attributes: &'static [wgpu::VertexAttribute] = match volume_type {
        VolumeType::ColoredCubes => &COLORED_CUBES_ATTRIBUTES,
        VolumeType::Terrain => &TERRAIN_ATTRIBUTES,
    };
    wgpu::VertexBufferLayout {
        array_stride: volume_type.vertex_stride() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

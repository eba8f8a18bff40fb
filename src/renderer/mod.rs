//! Renderer Module - scene traversal and wgpu draw recording

pub mod volume_renderer;
pub mod wgpu_draw;

pub use volume_renderer::{RenderStats, VolumeDrawContext, VolumeRenderer};
pub use wgpu_draw::{NodeDraw, NodeUniform, WgpuDrawList};

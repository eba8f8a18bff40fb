//! Per-frame traversal of the scene tree
//!
//! Pure read: draws every visible node with an installed mesh and recurses
//! into all populated children, whether or not the parent was drawn.

use glam::{Mat4, Vec3};

use crate::scene::{GpuMesh, SceneNode};
use crate::volume::VolumeType;

/// Receives the draws of one volume.
pub trait VolumeDrawContext<B> {
    /// Called once before any node of the volume is drawn.
    fn begin_volume(&mut self, volume_type: VolumeType);

    /// Draw `mesh.index_count` indices with the given model transform.
    /// `height` is the node's octree level.
    fn draw_node(&mut self, mesh: &GpuMesh<B>, model: Mat4, height: u32);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub nodes_visited: usize,
    pub draw_calls: usize,
    pub indices_submitted: u64,
    /// Installed meshes skipped because their layout differs from the volume's.
    pub type_mismatches: usize,
}

pub struct VolumeRenderer {
    world_transform: Mat4,
}

impl VolumeRenderer {
    pub fn new(world_transform: Mat4) -> Self {
        Self { world_transform }
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    pub fn set_world_transform(&mut self, world_transform: Mat4) {
        self.world_transform = world_transform;
    }

    /// Model transform of `node`: its position composed with the volume transform.
    pub fn node_transform<B>(&self, node: &SceneNode<B>) -> Mat4 {
        let [x, y, z] = node.position;
        self.world_transform * Mat4::from_translation(Vec3::new(x as f32, y as f32, z as f32))
    }

    /// Draw the whole tree under `root`.
    pub fn render_volume<B, C>(&self, ctx: &mut C, volume_type: VolumeType, root: &SceneNode<B>) -> RenderStats
    where
        C: VolumeDrawContext<B> + ?Sized,
    {
        let mut stats = RenderStats::default();
        ctx.begin_volume(volume_type);
        self.render_subtree(ctx, volume_type, root, &mut stats);
        log::trace!("[VolumeRenderer::render_volume] {:?}", stats);
        stats
    }

    pub fn render_subtree<B, C>(
        &self,
        ctx: &mut C,
        volume_type: VolumeType,
        node: &SceneNode<B>,
        stats: &mut RenderStats,
    ) where
        C: VolumeDrawContext<B> + ?Sized,
    {
        stats.nodes_visited += 1;

        if node.render_this_node {
            let installed = node.mesh.installed.lock();
            if let Some(mesh) = installed.as_ref().filter(|mesh| mesh.index_count > 0) {
                if mesh.volume_type == volume_type {
                    ctx.draw_node(mesh, self.node_transform(node), node.height);
                    stats.draw_calls += 1;
                    stats.indices_submitted += mesh.index_count as u64;
                } else {
                    stats.type_mismatches += 1;
                }
            }
        }

        for child in node.children.iter().flatten() {
            self.render_subtree(ctx, volume_type, child, stats);
        }
    }
}

impl Default for VolumeRenderer {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

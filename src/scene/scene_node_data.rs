//! Scene Node Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in scene_node_operations.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::volume::{Timestamp, VolumeType, OCTANT_COUNT};

/// Position of a node in the scene tree: depth plus one 3-bit octant per level,
/// root level in the lowest bits. This is the node's link to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeLocation {
    pub depth: u8,
    pub path: u64,
}

impl std::fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}:{:#x}", self.depth, self.path)
    }
}

/// Deepest level a [`NodeLocation`] can address.
pub const MAX_NODE_DEPTH: u8 = 21;

/// GPU buffers of one node, installed as a unit by the render thread.
///
/// Buffers are reference counted so a frame's draw list can keep them alive
/// after the slot lock is released.
#[derive(Debug)]
pub struct GpuMesh<B> {
    pub vertex_buffer: Arc<B>,
    pub index_buffer: Arc<B>,
    pub index_count: u32,
    pub volume_type: VolumeType,
    pub generation: u64,
}

/// The part of a node shared with in-flight upload jobs.
///
/// Only the render thread writes `installed`. The update thread bumps
/// `latest_generation` whenever it submits a job for this node and sets
/// `detached` when the node leaves the tree.
#[derive(Debug)]
pub struct MeshSlot<B> {
    pub installed: Mutex<Option<GpuMesh<B>>>,
    pub latest_generation: AtomicU64,
    pub detached: AtomicBool,
}

impl<B> Default for MeshSlot<B> {
    fn default() -> Self {
        Self {
            installed: Mutex::new(None),
            latest_generation: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        }
    }
}

/// Render-side mirror of one engine octree node.
///
/// Children are owned exclusively. The mesh slot is additionally held by any
/// pending upload job targeting this node.
#[derive(Debug)]
pub struct SceneNode<B> {
    pub location: NodeLocation,
    pub position: [i32; 3],
    pub height: u32,
    pub render_this_node: bool,
    /// Index count of the most recently submitted mesh. Zero once the mesh is
    /// removed. The drawable count lives on the installed [`GpuMesh`].
    pub pending_index_count: u32,

    pub structure_synced_at: Timestamp,
    pub properties_synced_at: Timestamp,
    pub mesh_synced_at: Timestamp,
    pub subtree_synced_at: Timestamp,

    /// Indexed by octant (`x | y << 1 | z << 2`).
    pub children: [Option<Box<SceneNode<B>>>; OCTANT_COUNT],
    pub mesh: Arc<MeshSlot<B>>,
}

impl<B> Drop for SceneNode<B> {
    fn drop(&mut self) {
        self.mesh.detached.store(true, Ordering::Release);
    }
}

//! Memory Volume Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in memory_volume_operations.rs

use std::sync::atomic::{AtomicU32, AtomicU64};

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{MeshPayload, NodeHandle, Timestamp, VolumeType, OCTANT_COUNT};

/// Side length in voxels of a height-0 node.
pub const LEAF_NODE_SIDE: i32 = 32;

/// One engine-side octree node.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub position: [i32; 3],
    pub height: u32,
    pub render_this_node: bool,
    pub mesh: Option<MeshPayload>,
    pub parent: Option<NodeHandle>,
    /// Indexed by octant (`x | y << 1 | z << 2`).
    pub children: [NodeHandle; OCTANT_COUNT],

    pub structure_last_changed: Timestamp,
    pub properties_last_changed: Timestamp,
    pub mesh_last_changed: Timestamp,
    pub node_or_subtree_last_changed: Timestamp,
}

/// Mutable octree state, guarded by [`MemoryVolume::state`].
#[derive(Debug, Default)]
pub struct MemoryVolumeState {
    pub nodes: FxHashMap<NodeHandle, MemoryNode>,
    pub root: Option<NodeHandle>,
    pub next_handle: u32,
    pub up_to_date: bool,
    pub last_eye: Option<Vec3>,
    /// Handles whose node/mesh queries are answered with an error.
    pub failing: FxHashSet<NodeHandle>,
    /// Handles whose mesh queries alone are answered with an error.
    pub failing_meshes: FxHashSet<NodeHandle>,
    /// Raw type code reported instead of the volume's own.
    pub reported_type_code: Option<u32>,
}

/// In-process stand-in for the external volume engine.
///
/// Edits and queries may come from different threads.
#[derive(Debug)]
pub struct MemoryVolume {
    pub volume_type: VolumeType,
    pub state: RwLock<MemoryVolumeState>,
    pub clock: AtomicU32,
    /// Per-handle count of `node()` queries.
    pub node_queries: Mutex<FxHashMap<NodeHandle, u32>>,
    pub mesh_queries: AtomicU64,
}

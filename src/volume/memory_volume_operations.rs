//! Memory Volume Operations - Pure DOP Functions
//!
//! Edits stamp the touched node with a fresh clock tick and push the same
//! tick up the parent chain as `node_or_subtree_last_changed`.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::memory_volume_data::{MemoryNode, MemoryVolume, MemoryVolumeState, LEAF_NODE_SIDE};
use super::{
    octant_coords, ColoredCubesVertex, EngineQueryError, MeshPayload, NodeHandle,
    OctreeNodeInfo, TerrainVertex, Timestamp, VolumeHandle, VolumeQueryClient, VolumeType,
    OCTANT_COUNT,
};

/// Create an empty volume with no root node.
pub fn create_memory_volume(volume_type: VolumeType) -> MemoryVolume {
    MemoryVolume {
        volume_type,
        state: RwLock::new(MemoryVolumeState {
            up_to_date: true,
            ..Default::default()
        }),
        clock: AtomicU32::new(0),
        node_queries: Mutex::new(FxHashMap::default()),
        mesh_queries: AtomicU64::new(0),
    }
}

/// Advance the engine clock and return the new time.
pub fn tick(volume: &MemoryVolume) -> Timestamp {
    volume.clock.fetch_add(1, Ordering::SeqCst) + 1
}

/// Side length in voxels of a node at `height`.
pub fn node_side(height: u32) -> i32 {
    LEAF_NODE_SIDE << height.min(20)
}

fn allocate_handle(state: &mut MemoryVolumeState) -> NodeHandle {
    let handle = NodeHandle(state.next_handle);
    state.next_handle += 1;
    handle
}

fn new_node(position: [i32; 3], height: u32, parent: Option<NodeHandle>, now: Timestamp) -> MemoryNode {
    MemoryNode {
        position,
        height,
        render_this_node: true,
        mesh: None,
        parent,
        children: [NodeHandle::INVALID; OCTANT_COUNT],
        structure_last_changed: now,
        properties_last_changed: now,
        mesh_last_changed: now,
        node_or_subtree_last_changed: now,
    }
}

fn touch_subtree(state: &mut MemoryVolumeState, handle: NodeHandle, now: Timestamp) {
    let mut current = Some(handle);
    while let Some(h) = current {
        current = match state.nodes.get_mut(&h) {
            Some(node) => {
                node.node_or_subtree_last_changed = now;
                node.parent
            }
            None => None,
        };
    }
}

fn node_mut<'a>(
    state: &'a mut MemoryVolumeState,
    handle: NodeHandle,
) -> Result<&'a mut MemoryNode, EngineQueryError> {
    state
        .nodes
        .get_mut(&handle)
        .ok_or(EngineQueryError::NoSuchNode(handle))
}

/// Create (or replace) the root node.
pub fn create_root(volume: &MemoryVolume, position: [i32; 3], height: u32) -> NodeHandle {
    let now = tick(volume);
    let mut state = volume.state.write();
    state.nodes.clear();
    let handle = allocate_handle(&mut state);
    state.nodes.insert(handle, new_node(position, height, None, now));
    state.root = Some(handle);
    log::debug!("[MemoryVolume::create_root] Root {} at {:?}", handle, position);
    handle
}

/// Drop the whole octree.
pub fn remove_root(volume: &MemoryVolume) {
    let mut state = volume.state.write();
    state.nodes.clear();
    state.root = None;
}

/// Add a child in `octant` of `parent`. Returns the existing child if the
/// slot is already populated.
pub fn add_child(
    volume: &MemoryVolume,
    parent: NodeHandle,
    octant: usize,
) -> Result<NodeHandle, EngineQueryError> {
    let now = tick(volume);
    let mut state = volume.state.write();
    let parent_node = node_mut(&mut state, parent)?;
    if parent_node.children[octant].is_valid() {
        return Ok(parent_node.children[octant]);
    }

    let child_height = parent_node.height.saturating_sub(1);
    let side = node_side(child_height);
    let [x, y, z] = octant_coords(octant);
    let base = parent_node.position;
    let position = [
        base[0] + x as i32 * side,
        base[1] + y as i32 * side,
        base[2] + z as i32 * side,
    ];

    let handle = allocate_handle(&mut state);
    state
        .nodes
        .insert(handle, new_node(position, child_height, Some(parent), now));
    let parent_node = node_mut(&mut state, parent)?;
    parent_node.children[octant] = handle;
    parent_node.structure_last_changed = now;
    touch_subtree(&mut state, parent, now);
    Ok(handle)
}

/// Remove the child subtree in `octant` of `parent`. Returns whether a
/// child was present.
pub fn remove_child(
    volume: &MemoryVolume,
    parent: NodeHandle,
    octant: usize,
) -> Result<bool, EngineQueryError> {
    let now = tick(volume);
    let mut state = volume.state.write();
    let parent_node = node_mut(&mut state, parent)?;
    let child = parent_node.children[octant];
    if !child.is_valid() {
        return Ok(false);
    }
    parent_node.children[octant] = NodeHandle::INVALID;
    parent_node.structure_last_changed = now;

    let mut doomed = vec![child];
    while let Some(handle) = doomed.pop() {
        if let Some(node) = state.nodes.remove(&handle) {
            doomed.extend(node.children.iter().copied().filter(|h| h.is_valid()));
        }
    }
    touch_subtree(&mut state, parent, now);
    Ok(true)
}

/// Replace the mesh of `handle`.
pub fn set_mesh(
    volume: &MemoryVolume,
    handle: NodeHandle,
    mesh: MeshPayload,
) -> Result<(), EngineQueryError> {
    let now = tick(volume);
    let mut state = volume.state.write();
    let node = node_mut(&mut state, handle)?;
    node.mesh = Some(mesh);
    node.mesh_last_changed = now;
    touch_subtree(&mut state, handle, now);
    Ok(())
}

/// Remove the mesh of `handle`.
pub fn clear_mesh(volume: &MemoryVolume, handle: NodeHandle) -> Result<(), EngineQueryError> {
    let now = tick(volume);
    let mut state = volume.state.write();
    let node = node_mut(&mut state, handle)?;
    node.mesh = None;
    node.mesh_last_changed = now;
    touch_subtree(&mut state, handle, now);
    Ok(())
}

/// Toggle whether `handle` should be drawn.
pub fn set_render_flag(
    volume: &MemoryVolume,
    handle: NodeHandle,
    render_this_node: bool,
) -> Result<(), EngineQueryError> {
    let now = tick(volume);
    let mut state = volume.state.write();
    let node = node_mut(&mut state, handle)?;
    node.render_this_node = render_this_node;
    node.properties_last_changed = now;
    touch_subtree(&mut state, handle, now);
    Ok(())
}

pub fn set_up_to_date(volume: &MemoryVolume, up_to_date: bool) {
    volume.state.write().up_to_date = up_to_date;
}

/// Make node and mesh queries for `handle` fail (or succeed again).
pub fn set_query_failure(volume: &MemoryVolume, handle: NodeHandle, failing: bool) {
    let mut state = volume.state.write();
    if failing {
        state.failing.insert(handle);
    } else {
        state.failing.remove(&handle);
    }
}

/// Make only mesh queries for `handle` fail (or succeed again).
pub fn set_mesh_query_failure(volume: &MemoryVolume, handle: NodeHandle, failing: bool) {
    let mut state = volume.state.write();
    if failing {
        state.failing_meshes.insert(handle);
    } else {
        state.failing_meshes.remove(&handle);
    }
}

/// Report `code` as the volume type code, or the real one again on `None`.
pub fn set_reported_type_code(volume: &MemoryVolume, code: Option<u32>) {
    volume.state.write().reported_type_code = code;
}

pub fn child_of(volume: &MemoryVolume, parent: NodeHandle, octant: usize) -> Option<NodeHandle> {
    let state = volume.state.read();
    state
        .nodes
        .get(&parent)
        .map(|node| node.children[octant])
        .filter(|h| h.is_valid())
}

pub fn node_count(volume: &MemoryVolume) -> usize {
    volume.state.read().nodes.len()
}

pub fn node_query_count(volume: &MemoryVolume, handle: NodeHandle) -> u32 {
    volume.node_queries.lock().get(&handle).copied().unwrap_or(0)
}

pub fn total_node_queries(volume: &MemoryVolume) -> u32 {
    volume.node_queries.lock().values().sum()
}

pub fn reset_query_counts(volume: &MemoryVolume) {
    volume.node_queries.lock().clear();
    volume.mesh_queries.store(0, Ordering::Relaxed);
}

/// Build a payload of `vertex_count` vertices and `index_count` indices
/// cycling through them.
pub fn create_filled_mesh(volume_type: VolumeType, vertex_count: u32, index_count: u32) -> MeshPayload {
    let vertex_count = vertex_count.min(u16::MAX as u32 + 1);
    let vertex_data = match volume_type {
        VolumeType::ColoredCubes => {
            let vertices: Vec<ColoredCubesVertex> = (0..vertex_count)
                .map(|i| ColoredCubesVertex {
                    encoded_pos_x: (i % 32) as u8,
                    encoded_pos_y: ((i / 32) % 32) as u8,
                    encoded_pos_z: ((i / 1024) % 32) as u8,
                    encoded_pos_w: 0,
                    data: 0xFF80_8080,
                })
                .collect();
            bytemuck::cast_slice(&vertices).to_vec()
        }
        VolumeType::Terrain => {
            let vertices: Vec<TerrainVertex> = (0..vertex_count)
                .map(|i| TerrainVertex {
                    encoded_pos_x: (i % 256) as u16,
                    encoded_pos_y: (i / 256) as u16,
                    encoded_pos_z: 0,
                    encoded_normal: 0,
                    materials: [255, 0, 0, 0, 0, 0, 0, 0],
                })
                .collect();
            bytemuck::cast_slice(&vertices).to_vec()
        }
    };
    let index_data = (0..index_count)
        .map(|i| (i % vertex_count.max(1)) as u16)
        .collect();

    MeshPayload {
        vertex_count,
        vertex_data,
        index_count,
        index_data,
    }
}

fn rejected(operation: &'static str, handle: NodeHandle) -> EngineQueryError {
    EngineQueryError::Rejected {
        operation,
        handle: handle.0,
        code: -1,
        message: "injected failure".to_string(),
    }
}

impl VolumeQueryClient for MemoryVolume {
    fn node(&self, handle: NodeHandle) -> Result<OctreeNodeInfo, EngineQueryError> {
        *self.node_queries.lock().entry(handle).or_insert(0) += 1;

        let state = self.state.read();
        if state.failing.contains(&handle) {
            return Err(rejected("get_node", handle));
        }
        let node = state
            .nodes
            .get(&handle)
            .ok_or(EngineQueryError::NoSuchNode(handle))?;

        let mut child_handles = [[[NodeHandle::INVALID; 2]; 2]; 2];
        for (octant, child) in node.children.iter().enumerate() {
            let [x, y, z] = octant_coords(octant);
            child_handles[x][y][z] = *child;
        }

        Ok(OctreeNodeInfo {
            position: node.position,
            height: node.height,
            render_this_node: node.render_this_node,
            has_mesh: node.mesh.is_some(),
            structure_last_changed: node.structure_last_changed,
            properties_last_changed: node.properties_last_changed,
            mesh_last_changed: node.mesh_last_changed,
            node_or_subtree_last_changed: node.node_or_subtree_last_changed,
            child_handles,
        })
    }

    fn mesh(&self, handle: NodeHandle) -> Result<MeshPayload, EngineQueryError> {
        self.mesh_queries.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read();
        if state.failing.contains(&handle) || state.failing_meshes.contains(&handle) {
            return Err(rejected("get_mesh", handle));
        }
        let node = state
            .nodes
            .get(&handle)
            .ok_or(EngineQueryError::NoSuchNode(handle))?;
        node.mesh.clone().ok_or_else(|| EngineQueryError::Rejected {
            operation: "get_mesh",
            handle: handle.0,
            code: -2,
            message: "node has no mesh".to_string(),
        })
    }

    fn volume_type_code(&self, handle: NodeHandle) -> Result<u32, EngineQueryError> {
        let state = self.state.read();
        if !state.nodes.contains_key(&handle) {
            return Err(EngineQueryError::NoSuchNode(handle));
        }
        Ok(state.reported_type_code.unwrap_or_else(|| self.volume_type.code()))
    }

    fn current_time(&self) -> Result<Timestamp, EngineQueryError> {
        Ok(tick(self))
    }

    fn update_volume(
        &self,
        _volume: VolumeHandle,
        eye: Vec3,
        lod_threshold: f32,
    ) -> Result<bool, EngineQueryError> {
        let mut state = self.state.write();
        state.last_eye = Some(eye);
        log::trace!(
            "[MemoryVolume::update_volume] eye={:?} lod_threshold={}",
            eye,
            lod_threshold
        );
        Ok(state.up_to_date)
    }

    fn root_node(&self, _volume: VolumeHandle) -> Result<Option<NodeHandle>, EngineQueryError> {
        Ok(self.state.read().root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_propagate_subtree_stamp() {
        let volume = create_memory_volume(VolumeType::ColoredCubes);
        let root = create_root(&volume, [0, 0, 0], 2);
        let child = add_child(&volume, root, 3).expect("Failed to add child");
        let grandchild = add_child(&volume, child, 0).expect("Failed to add grandchild");

        let before = volume.node(root).expect("Failed to query root");
        set_render_flag(&volume, grandchild, false).expect("Failed to set flag");
        let after = volume.node(root).expect("Failed to query root");

        assert!(after.node_or_subtree_last_changed > before.node_or_subtree_last_changed);
        assert_eq!(after.structure_last_changed, before.structure_last_changed);

        let grandchild_info = volume.node(grandchild).expect("Failed to query grandchild");
        assert!(!grandchild_info.render_this_node);
        assert_eq!(
            grandchild_info.properties_last_changed,
            after.node_or_subtree_last_changed
        );
    }

    #[test]
    fn test_child_positions_follow_octants() {
        let volume = create_memory_volume(VolumeType::Terrain);
        let root = create_root(&volume, [0, 0, 0], 1);
        let child = add_child(&volume, root, 5).expect("Failed to add child");
        let info = volume.node(child).expect("Failed to query child");
        assert_eq!(info.position, [LEAF_NODE_SIDE, 0, LEAF_NODE_SIDE]);
        assert_eq!(info.height, 0);

        let root_info = volume.node(root).expect("Failed to query root");
        assert_eq!(root_info.child_handles[1][0][1], child);
        assert_eq!(root_info.child_handle(5), child);
    }

    #[test]
    fn test_remove_child_drops_subtree() {
        let volume = create_memory_volume(VolumeType::ColoredCubes);
        let root = create_root(&volume, [0, 0, 0], 3);
        let child = add_child(&volume, root, 0).expect("Failed to add child");
        add_child(&volume, child, 1).expect("Failed to add grandchild");
        assert_eq!(node_count(&volume), 3);

        assert!(remove_child(&volume, root, 0).expect("Failed to remove child"));
        assert_eq!(node_count(&volume), 1);
        assert!(child_of(&volume, root, 0).is_none());
        assert!(matches!(
            volume.node(child),
            Err(EngineQueryError::NoSuchNode(_))
        ));
    }

    #[test]
    fn test_clock_strictly_increases() {
        let volume = create_memory_volume(VolumeType::ColoredCubes);
        let a = volume.current_time().expect("Failed to read clock");
        let b = volume.current_time().expect("Failed to read clock");
        assert!(b > a);
    }

    #[test]
    fn test_injected_failure() {
        let volume = create_memory_volume(VolumeType::ColoredCubes);
        let root = create_root(&volume, [0, 0, 0], 0);
        set_query_failure(&volume, root, true);
        assert!(matches!(
            volume.node(root),
            Err(EngineQueryError::Rejected { code: -1, .. })
        ));
        set_query_failure(&volume, root, false);
        assert!(volume.node(root).is_ok());
        assert_eq!(node_query_count(&volume, root), 2);
    }

    #[test]
    fn test_mesh_only_failure() {
        let volume = create_memory_volume(VolumeType::ColoredCubes);
        let root = create_root(&volume, [0, 0, 0], 0);
        set_mesh(&volume, root, create_filled_mesh(VolumeType::ColoredCubes, 4, 6))
            .expect("Failed to set mesh");

        set_mesh_query_failure(&volume, root, true);
        assert!(volume.node(root).is_ok());
        assert!(matches!(
            volume.mesh(root),
            Err(EngineQueryError::Rejected { operation: "get_mesh", .. })
        ));

        set_mesh_query_failure(&volume, root, false);
        assert_eq!(volume.mesh(root).expect("Failed to query mesh").index_count, 6);
    }

    #[test]
    fn test_type_code_goes_through_lookup() {
        let volume = create_memory_volume(VolumeType::Terrain);
        let root = create_root(&volume, [0, 0, 0], 0);
        assert_eq!(volume.volume_type(root).expect("Failed to query type"), VolumeType::Terrain);

        set_reported_type_code(&volume, Some(0));
        assert_eq!(
            volume.volume_type(root).expect("Failed to query type"),
            VolumeType::ColoredCubes
        );

        set_reported_type_code(&volume, Some(7));
        assert_eq!(
            volume.volume_type(root),
            Err(EngineQueryError::UnknownVolumeType { handle: root.0, code: 7 })
        );
    }

    #[test]
    fn test_filled_mesh_sizes() {
        let mesh = create_filled_mesh(VolumeType::Terrain, 10, 500);
        assert_eq!(mesh.vertex_data.len(), 10 * 16);
        assert_eq!(mesh.index_data.len(), 500);
        assert!(mesh.index_data.iter().all(|&i| i < 10));
    }
}

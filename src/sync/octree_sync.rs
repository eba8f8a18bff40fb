//! Octree synchronization
//!
//! Walks the engine octree and the scene tree in lockstep. Per node, work is
//! done in a fixed order: properties, mesh, structure, then recursion into
//! every valid child. A subtree whose engine stamp is not newer than the last
//! completed pass costs one query and is skipped.
//!
//! Everything a node needs is fetched before that node is mutated, so a
//! failed query leaves it at its last synced state. The subtree stamp is only
//! written after all children succeeded, which makes the next pass retry the
//! failed branch.

use thiserror::Error;

use super::sync_job::{create_clear_job, create_replace_job};
use crate::gpu::{JobSubmitter, QueueClosed};
use crate::scene::scene_node_operations as scene_ops;
use crate::scene::{NodeLocation, SceneNode, MAX_NODE_DEPTH};
use crate::volume::{
    EngineQueryError, MeshPayload, NodeHandle, OctreeNodeInfo, VolumeQueryClient, VolumeType,
    OCTANT_COUNT,
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Volume engine query failed: {0}")]
    EngineQuery(#[from] EngineQueryError),

    #[error("Invariant violated at node {location}: {reason}")]
    InvariantViolation {
        location: NodeLocation,
        reason: String,
    },

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

/// What one sync pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub nodes_visited: usize,
    pub subtrees_skipped: usize,
    pub properties_synced: usize,
    pub meshes_submitted: usize,
    pub meshes_cleared: usize,
    pub children_created: usize,
    pub children_destroyed: usize,
}

/// Brings scene subtrees up to date with the engine, queueing mesh uploads
/// for the render thread.
pub struct OctreeSyncEngine<B> {
    submitter: JobSubmitter<B>,
}

impl<B> OctreeSyncEngine<B> {
    pub fn new(submitter: JobSubmitter<B>) -> Self {
        Self { submitter }
    }

    /// Sync the scene subtree at `node` against engine node `handle`.
    pub fn sync<C>(
        &self,
        client: &C,
        handle: NodeHandle,
        node: &mut SceneNode<B>,
    ) -> Result<SyncStats, SyncError>
    where
        C: VolumeQueryClient + ?Sized,
    {
        let mut stats = SyncStats::default();
        match self.sync_node(client, handle, node, &mut stats) {
            Ok(()) => {
                if stats.nodes_visited > stats.subtrees_skipped {
                    log::debug!("[OctreeSync::sync] {:?}", stats);
                }
                Ok(stats)
            }
            Err(error) => {
                match &error {
                    SyncError::InvariantViolation { .. } => {
                        log::error!("[OctreeSync::sync] {}", error)
                    }
                    _ => log::warn!("[OctreeSync::sync] Pass aborted: {}", error),
                }
                Err(error)
            }
        }
    }

    fn sync_node<C>(
        &self,
        client: &C,
        handle: NodeHandle,
        node: &mut SceneNode<B>,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError>
    where
        C: VolumeQueryClient + ?Sized,
    {
        stats.nodes_visited += 1;
        let info = client.node(handle)?;

        if info.node_or_subtree_last_changed <= node.subtree_synced_at {
            stats.subtrees_skipped += 1;
            return Ok(());
        }

        if node.location.depth >= MAX_NODE_DEPTH
            && (0..OCTANT_COUNT).any(|octant| info.child_handle(octant).is_valid())
        {
            return Err(SyncError::InvariantViolation {
                location: node.location,
                reason: format!("engine reports children below depth {}", MAX_NODE_DEPTH),
            });
        }

        if info.properties_last_changed > node.properties_synced_at {
            let now = client.current_time()?;
            node.height = info.height;
            node.render_this_node = info.render_this_node;
            node.properties_synced_at = now;
            stats.properties_synced += 1;
        }

        if info.mesh_last_changed > node.mesh_synced_at {
            self.sync_mesh(client, handle, &info, node, stats)?;
        }

        if info.structure_last_changed > node.structure_synced_at {
            let now = client.current_time()?;
            for octant in 0..OCTANT_COUNT {
                if info.child_handle(octant).is_valid() {
                    if scene_ops::insert_child(node, octant) == Some(true) {
                        stats.children_created += 1;
                    }
                } else {
                    stats.children_destroyed += scene_ops::remove_child(node, octant);
                }
            }
            node.structure_synced_at = now;
        }

        for octant in 0..OCTANT_COUNT {
            let child_handle = info.child_handle(octant);
            if !child_handle.is_valid() {
                continue;
            }
            let location = node.location;
            let child = node.children[octant].as_deref_mut().ok_or_else(|| {
                SyncError::InvariantViolation {
                    location,
                    reason: format!(
                        "engine child {} in octant {} has no scene node",
                        child_handle, octant
                    ),
                }
            })?;
            self.sync_node(client, child_handle, child, stats)?;
        }

        node.subtree_synced_at = client.current_time()?;
        Ok(())
    }

    fn sync_mesh<C>(
        &self,
        client: &C,
        handle: NodeHandle,
        info: &OctreeNodeInfo,
        node: &mut SceneNode<B>,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError>
    where
        C: VolumeQueryClient + ?Sized,
    {
        if info.has_mesh {
            let payload = client.mesh(handle)?;
            let volume_type = client.volume_type(handle)?;
            validate_payload(node.location, volume_type, &payload)?;
            let now = client.current_time()?;

            if payload.index_count == 0 {
                log::debug!("[OctreeSync::sync_mesh] Node {} reported an empty mesh", node.location);
                self.clear_mesh(node, stats)?;
            } else {
                let index_count = payload.index_count;
                self.submitter
                    .submit(create_replace_job(node, volume_type, payload))?;
                node.position = info.position;
                node.pending_index_count = index_count;
                stats.meshes_submitted += 1;
            }
            node.mesh_synced_at = now;
        } else {
            let now = client.current_time()?;
            self.clear_mesh(node, stats)?;
            debug_assert_eq!(node.pending_index_count, 0);
            node.mesh_synced_at = now;
        }
        Ok(())
    }

    /// Release buffers of a node whose mesh went away. Nodes that never had
    /// one submitted need no job.
    fn clear_mesh(&self, node: &mut SceneNode<B>, stats: &mut SyncStats) -> Result<(), SyncError> {
        if node.pending_index_count == 0 {
            return Ok(());
        }
        self.submitter.submit(create_clear_job(node))?;
        node.pending_index_count = 0;
        stats.meshes_cleared += 1;
        Ok(())
    }
}

fn validate_payload(
    location: NodeLocation,
    volume_type: VolumeType,
    payload: &MeshPayload,
) -> Result<(), SyncError> {
    let expected_vertex_bytes = payload.vertex_count as usize * volume_type.vertex_stride();
    if payload.vertex_data.len() != expected_vertex_bytes {
        return Err(SyncError::InvariantViolation {
            location,
            reason: format!(
                "{} vertex data is {} bytes, expected {} for {} vertices",
                volume_type.label(),
                payload.vertex_data.len(),
                expected_vertex_bytes,
                payload.vertex_count
            ),
        });
    }
    if payload.index_data.len() != payload.index_count as usize {
        return Err(SyncError::InvariantViolation {
            location,
            reason: format!(
                "index data holds {} indices, engine reported {}",
                payload.index_data.len(),
                payload.index_count
            ),
        });
    }
    Ok(())
}

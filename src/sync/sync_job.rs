//! Deferred GPU work produced by the sync pass

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::scene::{MeshSlot, NodeLocation, SceneNode};
use crate::volume::{MeshPayload, VolumeType};

/// Mesh bytes copied out of the engine, ready for buffer creation.
#[derive(Debug, Clone)]
pub struct MeshUpload {
    pub volume_type: VolumeType,
    pub vertex_count: u32,
    pub vertex_bytes: Vec<u8>,
    pub index_count: u32,
    /// 16-bit indices, native byte order.
    pub index_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum MeshOperation {
    /// Release the node's buffers and create new ones from the upload.
    Replace(MeshUpload),
    /// Release the node's buffers.
    Clear,
}

/// One unit of work for the render thread.
///
/// Holds a strong reference to the target's mesh slot, so the job stays
/// valid after the node itself has been dropped from the tree.
#[derive(Debug)]
pub struct SyncJob<B> {
    pub target: Arc<MeshSlot<B>>,
    pub location: NodeLocation,
    pub generation: u64,
    pub operation: MeshOperation,
}

fn next_generation<B>(node: &SceneNode<B>) -> u64 {
    node.mesh.latest_generation.fetch_add(1, Ordering::AcqRel) + 1
}

/// Package a buffer replacement for `node`. Supersedes any job already
/// queued for it.
pub fn create_replace_job<B>(
    node: &SceneNode<B>,
    volume_type: VolumeType,
    payload: MeshPayload,
) -> SyncJob<B> {
    let upload = MeshUpload {
        volume_type,
        vertex_count: payload.vertex_count,
        vertex_bytes: payload.vertex_data,
        index_count: payload.index_count,
        index_bytes: bytemuck::cast_slice(&payload.index_data).to_vec(),
    };
    SyncJob {
        target: Arc::clone(&node.mesh),
        location: node.location,
        generation: next_generation(node),
        operation: MeshOperation::Replace(upload),
    }
}

/// Package a buffer release for `node`. Supersedes any job already queued for it.
pub fn create_clear_job<B>(node: &SceneNode<B>) -> SyncJob<B> {
    SyncJob {
        target: Arc::clone(&node.mesh),
        location: node.location,
        generation: next_generation(node),
        operation: MeshOperation::Clear,
    }
}

//! Synchronous query interface to the volume engine

use glam::Vec3;
use thiserror::Error;

use super::{MeshPayload, NodeHandle, OctreeNodeInfo, Timestamp, VolumeHandle, VolumeType};

/// A non-success answer from the volume engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineQueryError {
    #[error("Engine rejected {operation} for handle {handle}: code {code} ({message})")]
    Rejected {
        operation: &'static str,
        handle: u32,
        code: i32,
        message: String,
    },

    #[error("Engine reported unknown volume type code {code} for handle {handle}")]
    UnknownVolumeType { handle: u32, code: u32 },

    #[error("Engine has no node {0}")]
    NoSuchNode(NodeHandle),
}

/// Request/response surface of the external volume engine.
///
/// Calls are synchronous and expected to return promptly. The client holds no
/// mirror state; it is only ever asked about handles it reported itself.
pub trait VolumeQueryClient {
    /// Metadata and child handles of one octree node.
    fn node(&self, handle: NodeHandle) -> Result<OctreeNodeInfo, EngineQueryError>;

    /// Vertex/index payload of a node that reports `has_mesh`.
    fn mesh(&self, handle: NodeHandle) -> Result<MeshPayload, EngineQueryError>;

    /// Raw volume type code the engine reports for `handle`.
    fn volume_type_code(&self, handle: NodeHandle) -> Result<u32, EngineQueryError>;

    /// Vertex layout of the meshes under `handle`.
    fn volume_type(&self, handle: NodeHandle) -> Result<VolumeType, EngineQueryError> {
        let code = self.volume_type_code(handle)?;
        VolumeType::from_code(code).ok_or(EngineQueryError::UnknownVolumeType {
            handle: handle.0,
            code,
        })
    }

    /// Current logical time. Strictly increasing across calls.
    fn current_time(&self) -> Result<Timestamp, EngineQueryError>;

    /// Let the engine refresh the volume for a viewer at `eye`. Returns the
    /// engine's own "is up to date" hint.
    fn update_volume(
        &self,
        volume: VolumeHandle,
        eye: Vec3,
        lod_threshold: f32,
    ) -> Result<bool, EngineQueryError>;

    /// Root node of the volume's octree, if the engine has built one yet.
    fn root_node(&self, volume: VolumeHandle) -> Result<Option<NodeHandle>, EngineQueryError>;
}

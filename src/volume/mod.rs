//! Volume engine boundary
//!
//! The external volume engine owns the octree. This module holds the
//! request/response types the mirror reads it through, the vertex records
//! each volume type produces, and an in-memory engine used for tests, demos
//! and benchmarks.

pub mod client;
pub mod memory_volume_data;
pub mod memory_volume_operations;
pub mod node_info;
pub mod vertex;

pub use client::{EngineQueryError, VolumeQueryClient};
pub use memory_volume_data::{MemoryNode, MemoryVolume, MemoryVolumeState};
pub use node_info::{
    octant_coords, octant_index, MeshPayload, NodeHandle, OctreeNodeInfo, Timestamp,
    VolumeHandle, VolumeType, OCTANT_COUNT,
};
pub use vertex::{ColoredCubesVertex, TerrainVertex};

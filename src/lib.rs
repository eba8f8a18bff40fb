// Volume Mirror
//
// Mirrors a sparse voxel octree owned by an external volume engine into a
// render-side scene tree, and uploads node meshes to the GPU without stalling
// the engine's update thread.
//
// - volume: query interface to the engine, vertex layouts, in-memory engine
// - scene: render-side node tree (*_data / *_operations)
// - sync: per-node timestamp diff, produces upload jobs
// - gpu: mesh devices and the cross-thread command queue
// - renderer: per-frame traversal and wgpu draw recording
// - frame: host entry points tying the above together

pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod renderer;
pub mod scene;
pub mod sync;
pub mod volume;

pub use config::{MirrorConfig, UploadCadence};
pub use error::{MirrorError, MirrorErrorContext, MirrorResult};
pub use frame::{create_root_node, destroy_root_node, render_frame, sync_frame, FrameReport};
pub use gpu::{
    DrainReport, GpuError, GpuResourceCommandQueue, HeadlessDevice, JobSubmitter, MeshDevice,
    WgpuMeshDevice,
};
pub use renderer::{RenderStats, VolumeDrawContext, VolumeRenderer, WgpuDrawList};
pub use scene::{SceneNode, SceneRoot};
pub use sync::{OctreeSyncEngine, SyncError, SyncStats};
pub use volume::{
    EngineQueryError, MeshPayload, NodeHandle, OctreeNodeInfo, VolumeHandle, VolumeQueryClient,
    VolumeType,
};

// Re-export wgpu so hosts build pipelines against the same version
pub use wgpu;

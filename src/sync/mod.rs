//! Engine-to-scene synchronization and the jobs it hands to the render thread

pub mod octree_sync;
pub mod sync_job;

pub use octree_sync::{OctreeSyncEngine, SyncError, SyncStats};
pub use sync_job::{MeshOperation, MeshUpload, SyncJob};

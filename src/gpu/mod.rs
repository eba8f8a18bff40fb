//! GPU resource creation and the cross-thread command queue

pub mod command_queue;
pub mod headless;
pub mod mesh_device;
pub mod wgpu_device;

pub use command_queue::{DrainReport, GpuResourceCommandQueue, JobSubmitter, QueueClosed};
pub use headless::{HeadlessBuffer, HeadlessDevice};
pub use mesh_device::{GpuError, MeshDevice};
pub use wgpu_device::WgpuMeshDevice;

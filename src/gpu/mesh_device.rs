//! Buffer creation seam between the command queue and the graphics device

use thiserror::Error;

/// Buffer creation failure. Contained to the node whose upload failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("Buffer '{label}' is empty")]
    EmptyBuffer { label: String },

    #[error("Buffer '{label}' of {size} bytes exceeds device limit of {limit} bytes")]
    BufferTooLarge { label: String, size: u64, limit: u64 },

    #[error("Device rejected buffer '{label}': {reason}")]
    CreationFailed { label: String, reason: String },
}

/// Creates the vertex and index buffers for node meshes.
///
/// Only ever called from the render thread, during queue drain.
pub trait MeshDevice {
    type Buffer: Send + Sync + 'static;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, GpuError>;

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer, GpuError>;
}

/// Reject empty or oversized contents before touching the device.
pub fn check_buffer_size(label: &str, contents: &[u8], limit: u64) -> Result<(), GpuError> {
    let size = contents.len() as u64;
    if size == 0 {
        return Err(GpuError::EmptyBuffer {
            label: label.to_string(),
        });
    }
    if size > limit {
        return Err(GpuError::BufferTooLarge {
            label: label.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

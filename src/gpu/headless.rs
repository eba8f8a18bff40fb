//! CPU-backed mesh device
//!
//! Keeps buffer contents in memory. Used where no adapter is available:
//! tests, benchmarks and the threaded demo.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::mesh_device::{check_buffer_size, GpuError, MeshDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessBufferKind {
    Vertex,
    Index,
}

#[derive(Debug)]
pub struct HeadlessBuffer {
    pub label: String,
    pub kind: HeadlessBufferKind,
    pub contents: Vec<u8>,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    max_buffer_size: u64,
    buffers_created: AtomicUsize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::with_max_buffer_size(256 * 1024 * 1024)
    }

    /// Device whose buffers fail to allocate above `max_buffer_size` bytes.
    pub fn with_max_buffer_size(max_buffer_size: u64) -> Self {
        Self {
            max_buffer_size,
            buffers_created: AtomicUsize::new(0),
        }
    }

    /// Number of buffers successfully created so far.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::Relaxed)
    }

    fn create(
        &self,
        label: &str,
        contents: &[u8],
        kind: HeadlessBufferKind,
    ) -> Result<HeadlessBuffer, GpuError> {
        check_buffer_size(label, contents, self.max_buffer_size)?;
        self.buffers_created.fetch_add(1, Ordering::Relaxed);
        Ok(HeadlessBuffer {
            label: label.to_string(),
            kind,
            contents: contents.to_vec(),
        })
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshDevice for HeadlessDevice {
    type Buffer = HeadlessBuffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<HeadlessBuffer, GpuError> {
        self.create(label, contents, HeadlessBufferKind::Vertex)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<HeadlessBuffer, GpuError> {
        self.create(label, contents, HeadlessBufferKind::Index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit() {
        let device = HeadlessDevice::with_max_buffer_size(16);
        assert!(device.create_vertex_buffer("ok", &[0u8; 16]).is_ok());
        assert!(matches!(
            device.create_index_buffer("big", &[0u8; 17]),
            Err(GpuError::BufferTooLarge { size: 17, limit: 16, .. })
        ));
        assert!(matches!(
            device.create_index_buffer("empty", &[]),
            Err(GpuError::EmptyBuffer { .. })
        ));
        assert_eq!(device.buffers_created(), 1);
    }
}

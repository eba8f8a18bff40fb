//! wgpu-backed mesh device

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::mesh_device::{check_buffer_size, GpuError, MeshDevice};

/// Creates node buffers on a wgpu device.
///
/// Each creation runs inside out-of-memory and validation error scopes so a
/// failed allocation surfaces as a [`GpuError`] for that node instead of an
/// uncaptured device error.
pub struct WgpuMeshDevice {
    device: Arc<wgpu::Device>,
}

impl WgpuMeshDevice {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    fn create(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer, GpuError> {
        check_buffer_size(label, contents, self.device.limits().max_buffer_size)?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(error) = validation.or(out_of_memory) {
            log::error!("[WgpuMeshDevice::create] Buffer '{}' failed: {}", label, error);
            buffer.destroy();
            return Err(GpuError::CreationFailed {
                label: label.to_string(),
                reason: error.to_string(),
            });
        }
        Ok(buffer)
    }
}

impl MeshDevice for WgpuMeshDevice {
    type Buffer = wgpu::Buffer;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer, GpuError> {
        self.create(label, contents, wgpu::BufferUsages::VERTEX)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer, GpuError> {
        self.create(label, contents, wgpu::BufferUsages::INDEX)
    }
}

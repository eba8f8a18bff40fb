//! Cross-thread GPU resource command queue
//!
//! Any thread may submit mesh jobs through a [`JobSubmitter`]. The render
//! thread owns the queue and the device and is the only consumer.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use super::mesh_device::{GpuError, MeshDevice};
use crate::scene::{GpuMesh, MeshSlot, NodeLocation};
use crate::sync::{MeshOperation, MeshUpload, SyncJob};

/// The consuming side of the queue is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("GPU resource command queue has been dropped")]
pub struct QueueClosed;

/// Producer handle, cheap to clone and send to other threads.
pub struct JobSubmitter<B> {
    sender: Sender<SyncJob<B>>,
}

impl<B> JobSubmitter<B> {
    /// Enqueue without blocking.
    pub fn submit(&self, job: SyncJob<B>) -> Result<(), QueueClosed> {
        self.sender.send(job).map_err(|_| QueueClosed)
    }

    /// Jobs waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

impl<B> Clone for JobSubmitter<B> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Outcome counts of one or more drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Replacement jobs whose buffers were created and installed.
    pub installed: usize,
    /// Clear jobs that released a node's buffers.
    pub cleared: usize,
    /// Jobs skipped because a newer job for the same node was submitted.
    pub superseded: usize,
    /// Jobs skipped because their node had left the tree.
    pub orphaned: usize,
    /// Replacement jobs whose buffer creation failed.
    pub failed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.installed + self.cleared + self.superseded + self.orphaned + self.failed
    }

    pub fn merge(&mut self, other: &DrainReport) {
        self.installed += other.installed;
        self.cleared += other.cleared;
        self.superseded += other.superseded;
        self.orphaned += other.orphaned;
        self.failed += other.failed;
    }
}

/// Multi-producer, single-consumer queue of deferred mesh uploads.
pub struct GpuResourceCommandQueue<D: MeshDevice> {
    device: D,
    sender: Sender<SyncJob<D::Buffer>>,
    receiver: Receiver<SyncJob<D::Buffer>>,
    totals: DrainReport,
}

impl<D: MeshDevice> GpuResourceCommandQueue<D> {
    pub fn new(device: D) -> Self {
        let (sender, receiver) = unbounded();
        log::info!("[CommandQueue::new] GPU resource command queue created");
        Self {
            device,
            sender,
            receiver,
            totals: DrainReport::default(),
        }
    }

    /// A producer handle for the update thread.
    pub fn submitter(&self) -> JobSubmitter<D::Buffer> {
        JobSubmitter {
            sender: self.sender.clone(),
        }
    }

    /// Enqueue a job from the render thread itself.
    pub fn submit(&self, job: SyncJob<D::Buffer>) {
        // The queue owns a receiver, so the channel cannot be disconnected here.
        let _ = self.sender.send(job);
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Cumulative counts over every drain so far.
    pub fn totals(&self) -> DrainReport {
        self.totals
    }

    /// Execute every job enqueued at the time of the call, oldest first.
    /// Jobs submitted while draining wait for the next call.
    pub fn drain_and_execute(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let pending = self.receiver.len();

        for _ in 0..pending {
            let Ok(job) = self.receiver.try_recv() else {
                break;
            };
            self.execute(job, &mut report);
        }

        if report.total() > 0 {
            log::debug!(
                "[CommandQueue::drain] installed={} cleared={} superseded={} orphaned={} failed={} remaining={}",
                report.installed,
                report.cleared,
                report.superseded,
                report.orphaned,
                report.failed,
                self.receiver.len()
            );
        }
        self.totals.merge(&report);
        report
    }

    fn execute(&self, job: SyncJob<D::Buffer>, report: &mut DrainReport) {
        let SyncJob {
            target,
            location,
            generation,
            operation,
        } = job;

        if target.detached.load(Ordering::Acquire) {
            report.orphaned += 1;
            return;
        }
        if generation < target.latest_generation.load(Ordering::Acquire) {
            report.superseded += 1;
            return;
        }

        // Previous buffers go first, whatever the outcome.
        let previous = target.installed.lock().take();
        drop(previous);

        match operation {
            MeshOperation::Clear => report.cleared += 1,
            MeshOperation::Replace(upload) => {
                match self.create_mesh(location, generation, &upload) {
                    Ok(mesh) => {
                        install(&target, mesh);
                        report.installed += 1;
                    }
                    Err(error) => {
                        log::warn!(
                            "[CommandQueue::execute] Upload for node {} failed: {}",
                            location,
                            error
                        );
                        report.failed += 1;
                    }
                }
            }
        }
    }

    fn create_mesh(
        &self,
        location: NodeLocation,
        generation: u64,
        upload: &MeshUpload,
    ) -> Result<GpuMesh<D::Buffer>, GpuError> {
        let name = upload.volume_type.label();
        let vertex_label = format!("{} vertices {}", name, location);
        let index_label = format!("{} indices {}", name, location);

        let vertex_buffer = self
            .device
            .create_vertex_buffer(&vertex_label, &upload.vertex_bytes)?;
        let index_buffer = self
            .device
            .create_index_buffer(&index_label, &upload.index_bytes)?;

        Ok(GpuMesh {
            vertex_buffer: Arc::new(vertex_buffer),
            index_buffer: Arc::new(index_buffer),
            index_count: upload.index_count,
            volume_type: upload.volume_type,
            generation,
        })
    }
}

fn install<B>(slot: &MeshSlot<B>, mesh: GpuMesh<B>) {
    *slot.installed.lock() = Some(mesh);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{HeadlessBuffer, HeadlessDevice};
    use crate::scene::scene_node_operations::{create_root_node, installed_index_count, mesh_ready};
    use crate::scene::SceneNode;
    use crate::sync::sync_job::{create_clear_job, create_replace_job};
    use crate::volume::memory_volume_operations::create_filled_mesh;
    use crate::volume::VolumeType;

    fn replace_job(node: &SceneNode<HeadlessBuffer>, indices: u32) -> SyncJob<HeadlessBuffer> {
        let payload = create_filled_mesh(VolumeType::ColoredCubes, 8, indices);
        create_replace_job(node, VolumeType::ColoredCubes, payload)
    }

    #[test]
    fn test_drain_installs_mesh() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let node = create_root_node::<HeadlessBuffer>();

        queue.submitter().submit(replace_job(&node, 36)).expect("Failed to submit");
        assert!(!mesh_ready(&node));
        assert_eq!(queue.pending(), 1);

        let report = queue.drain_and_execute();
        assert_eq!(report.installed, 1);
        assert!(mesh_ready(&node));
        assert_eq!(installed_index_count(&node), 36);

        let guard = node.mesh.installed.lock();
        let mesh = guard.as_ref().expect("Mesh should be installed");
        assert_eq!(mesh.vertex_buffer.contents.len(), 8 * 8);
        assert_eq!(mesh.index_buffer.contents.len(), 36 * 2);
    }

    #[test]
    fn test_newer_job_supersedes_older() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let node = create_root_node::<HeadlessBuffer>();

        queue.submit(replace_job(&node, 6));
        queue.submit(replace_job(&node, 12));

        let report = queue.drain_and_execute();
        assert_eq!(report.superseded, 1);
        assert_eq!(report.installed, 1);
        assert_eq!(installed_index_count(&node), 12);
        assert_eq!(queue.device().buffers_created(), 2);
    }

    #[test]
    fn test_clear_releases_buffers() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let node = create_root_node::<HeadlessBuffer>();

        queue.submit(replace_job(&node, 6));
        queue.drain_and_execute();
        assert!(mesh_ready(&node));

        queue.submit(create_clear_job(&node));
        let report = queue.drain_and_execute();
        assert_eq!(report.cleared, 1);
        assert!(!mesh_ready(&node));
        assert!(node.mesh.installed.lock().is_none());
    }

    #[test]
    fn test_orphaned_job_is_discarded() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let node = create_root_node::<HeadlessBuffer>();
        let slot = Arc::clone(&node.mesh);

        queue.submit(replace_job(&node, 6));
        drop(node);
        assert_eq!(Arc::strong_count(&slot), 2);

        let report = queue.drain_and_execute();
        assert_eq!(report.orphaned, 1);
        assert_eq!(queue.device().buffers_created(), 0);
        assert_eq!(Arc::strong_count(&slot), 1);
    }

    #[test]
    fn test_failed_upload_leaves_node_not_ready() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::with_max_buffer_size(64));
        let node = create_root_node::<HeadlessBuffer>();

        queue.submit(replace_job(&node, 6));
        queue.drain_and_execute();
        assert!(mesh_ready(&node));

        // 40 vertices of 8 bytes no longer fit.
        let payload = create_filled_mesh(VolumeType::ColoredCubes, 40, 6);
        queue.submit(create_replace_job(&node, VolumeType::ColoredCubes, payload));
        let report = queue.drain_and_execute();

        assert_eq!(report.failed, 1);
        assert!(!mesh_ready(&node));
        assert_eq!(queue.totals().installed, 1);
    }

    #[test]
    fn test_drain_only_takes_jobs_present_at_call() {
        let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let a = create_root_node::<HeadlessBuffer>();
        let b = create_root_node::<HeadlessBuffer>();
        let submitter = queue.submitter();

        submitter.submit(replace_job(&a, 6)).expect("Failed to submit");
        let report = queue.drain_and_execute();
        assert_eq!(report.installed, 1);

        submitter.submit(replace_job(&b, 6)).expect("Failed to submit");
        assert_eq!(submitter.pending(), 1);
        queue.drain_and_execute();
        assert!(mesh_ready(&b));
    }

    #[test]
    fn test_submit_after_queue_dropped() {
        let queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
        let submitter = queue.submitter();
        drop(queue);

        let node = create_root_node::<HeadlessBuffer>();
        assert_eq!(submitter.submit(replace_job(&node, 6)), Err(QueueClosed));
    }
}

//! Host entry points
//!
//! The update thread calls [`sync_frame`] once per tick. The render thread
//! calls [`render_frame`] once per frame. Both share the [`SceneRoot`]
//! returned by [`create_root_node`].

use glam::Vec3;

use crate::config::MirrorConfig;
use crate::error::MirrorResult;
use crate::gpu::{DrainReport, GpuResourceCommandQueue, MeshDevice};
use crate::renderer::{RenderStats, VolumeDrawContext, VolumeRenderer};
use crate::scene::{scene_node_operations, SceneRoot};
use crate::sync::OctreeSyncEngine;
use crate::volume::{VolumeHandle, VolumeQueryClient, VolumeType};

/// What the render thread did in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// `None` on frames where draining was skipped.
    pub drain: Option<DrainReport>,
    pub render: RenderStats,
    /// The update thread was mid-sync, so the tree was not traversed and the
    /// draw context still holds the previous frame's draws.
    pub traversal_skipped: bool,
}

/// Create an empty, never-synced scene root.
pub fn create_root_node<B>() -> SceneRoot<B> {
    SceneRoot::new(Some(scene_node_operations::create_root_node()))
}

/// Release the scene tree. Jobs still queued for its nodes are discarded
/// when drained.
pub fn destroy_root_node<B>(root: SceneRoot<B>) {
    let released = root.write().take();
    if let Some(node) = released {
        log::info!(
            "[frame::destroy_root_node] Releasing {} scene nodes",
            scene_node_operations::count_nodes(&node)
        );
    }
}

/// Let the engine update the volume for a viewer at `eye`, then bring the
/// scene tree up to date. Returns the engine's "is up to date" hint.
///
/// The scene root is created once the engine reports a root node and
/// released again if the engine drops it.
pub fn sync_frame<B, C>(
    engine: &OctreeSyncEngine<B>,
    client: &C,
    volume: VolumeHandle,
    eye: Vec3,
    config: &MirrorConfig,
    root: &SceneRoot<B>,
) -> MirrorResult<bool>
where
    C: VolumeQueryClient + ?Sized,
{
    let up_to_date = client.update_volume(volume, eye, config.lod_threshold)?;
    let engine_root = client.root_node(volume)?;

    let mut scene = root.write();
    match engine_root {
        Some(handle) => {
            let node = scene.get_or_insert_with(scene_node_operations::create_root_node);
            engine.sync(client, handle, node)?;
        }
        None => {
            if scene.take().is_some() {
                log::info!("[frame::sync_frame] Volume has no root node, releasing scene tree");
            }
        }
    }
    Ok(up_to_date)
}

/// Drain pending uploads (subject to the configured cadence) and draw the tree.
///
/// Never waits on the update thread. If a sync pass holds the tree, the
/// traversal is skipped and `ctx` is left untouched, so a host can present
/// the previous frame's draw list again.
pub fn render_frame<D, C>(
    queue: &mut GpuResourceCommandQueue<D>,
    renderer: &VolumeRenderer,
    config: &MirrorConfig,
    frame_index: u64,
    ctx: &mut C,
    volume_type: VolumeType,
    root: &SceneRoot<D::Buffer>,
) -> FrameReport
where
    D: MeshDevice,
    C: VolumeDrawContext<D::Buffer> + ?Sized,
{
    let drain = config
        .should_drain(frame_index)
        .then(|| queue.drain_and_execute());

    let Some(scene) = root.try_read() else {
        log::trace!("[frame::render_frame] Tree busy with a sync pass, reusing last draws");
        return FrameReport {
            drain,
            render: RenderStats::default(),
            traversal_skipped: true,
        };
    };
    let render = match scene.as_ref() {
        Some(node) => renderer.render_volume(ctx, volume_type, node),
        None => RenderStats::default(),
    };
    FrameReport {
        drain,
        render,
        traversal_skipped: false,
    }
}

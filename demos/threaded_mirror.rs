//! Two-thread mirror demo
//!
//! An update thread edits an in-memory volume at random and syncs the scene
//! tree; the main thread plays the render thread, draining uploads and
//! traversing the tree into a headless device.
//!
//! Run with `RUST_LOG=info cargo run --example threaded_mirror [config.toml]`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use rand::Rng;

use volume_mirror::gpu::HeadlessBuffer;
use volume_mirror::scene::GpuMesh;
use volume_mirror::volume::memory_volume_operations as engine;
use volume_mirror::volume::{MemoryVolume, NodeHandle, OCTANT_COUNT};
use volume_mirror::{
    create_root_node, destroy_root_node, render_frame, sync_frame, DrainReport,
    GpuResourceCommandQueue, HeadlessDevice, MirrorConfig, OctreeSyncEngine,
    VolumeDrawContext, VolumeHandle, VolumeRenderer, VolumeType,
};

const VOLUME: VolumeHandle = VolumeHandle(0);
const TICKS: u32 = 200;

#[derive(Default)]
struct FrameCounter {
    draws: usize,
    indices: u64,
}

impl VolumeDrawContext<HeadlessBuffer> for FrameCounter {
    fn begin_volume(&mut self, _volume_type: VolumeType) {
        self.draws = 0;
        self.indices = 0;
    }

    fn draw_node(&mut self, mesh: &GpuMesh<HeadlessBuffer>, _model: Mat4, _height: u32) {
        self.draws += 1;
        self.indices += mesh.index_count as u64;
    }
}

fn random_edit(volume: &MemoryVolume, root: NodeHandle, rng: &mut impl Rng) -> Result<()> {
    let octant = rng.gen_range(0..OCTANT_COUNT);
    match engine::child_of(volume, root, octant) {
        None => {
            let child = engine::add_child(volume, root, octant)?;
            let indices = 6 * rng.gen_range(1..200);
            engine::set_mesh(
                volume,
                child,
                engine::create_filled_mesh(VolumeType::ColoredCubes, 64, indices),
            )?;
        }
        Some(child) => match rng.gen_range(0..4) {
            0 => {
                engine::remove_child(volume, root, octant)?;
            }
            1 => {
                let visible = rng.gen_bool(0.5);
                engine::set_render_flag(volume, child, visible)?;
            }
            2 => engine::clear_mesh(volume, child)?,
            _ => {
                let indices = 6 * rng.gen_range(1..200);
                engine::set_mesh(
                    volume,
                    child,
                    engine::create_filled_mesh(VolumeType::ColoredCubes, 64, indices),
                )?;
            }
        },
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => MirrorConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => MirrorConfig::default(),
    };

    let volume = Arc::new(engine::create_memory_volume(VolumeType::ColoredCubes));
    let root_handle = engine::create_root(&volume, [0, 0, 0], 3);
    engine::set_mesh(
        &volume,
        root_handle,
        engine::create_filled_mesh(VolumeType::ColoredCubes, 256, 1536),
    )?;

    let mut queue = GpuResourceCommandQueue::new(HeadlessDevice::new());
    let scene = create_root_node::<HeadlessBuffer>();

    let update = {
        let volume = Arc::clone(&volume);
        let scene = scene.clone();
        let submitter = queue.submitter();
        let config = config.clone();
        thread::spawn(move || -> Result<u32> {
            let sync = OctreeSyncEngine::new(submitter);
            let mut rng = rand::thread_rng();
            let mut stale_ticks = 0;

            for tick in 0..TICKS {
                random_edit(&volume, root_handle, &mut rng)?;
                let eye = Vec3::new(tick as f32, 64.0, 0.0);
                let up_to_date = sync_frame(&sync, volume.as_ref(), VOLUME, eye, &config, &scene)?;
                if !up_to_date {
                    stale_ticks += 1;
                }
                thread::sleep(Duration::from_millis(2));
            }
            Ok(stale_ticks)
        })
    };

    let renderer = VolumeRenderer::new(config.world_transform());
    let mut counter = FrameCounter::default();
    let mut uploads = DrainReport::default();
    let mut frame = 0u64;
    let mut busy_frames = 0u64;

    while !update.is_finished() {
        let report = render_frame(
            &mut queue,
            &renderer,
            &config,
            frame,
            &mut counter,
            VolumeType::ColoredCubes,
            &scene,
        );
        if let Some(drain) = report.drain {
            uploads.merge(&drain);
        }
        if report.traversal_skipped {
            busy_frames += 1;
        }
        if frame % 60 == 0 {
            log::info!(
                "frame {}: {} draws, {} indices, {} jobs pending",
                frame,
                counter.draws,
                counter.indices,
                queue.pending()
            );
        }
        frame += 1;
        thread::sleep(Duration::from_millis(1));
    }

    match update.join() {
        Ok(result) => {
            let stale_ticks = result?;
            log::info!("update thread finished, {} ticks not up to date", stale_ticks);
        }
        Err(_) => anyhow::bail!("update thread panicked"),
    }

    uploads.merge(&queue.drain_and_execute());
    log::info!(
        "{} frames ({} reused during sync), {} buffers created, uploads: {:?}",
        frame,
        busy_frames,
        queue.device().buffers_created(),
        uploads
    );

    destroy_root_node(scene);
    Ok(())
}

//! Mirror configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! upload_cadence = "alternate_frames"
//! stereo_rendering = true
//! lod_threshold = 1.5
//! ```

use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, MirrorErrorContext, MirrorResult};

/// How often the render thread drains the command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadCadence {
    EveryFrame,
    /// Skip odd frames while stereo rendering, halving upload cost.
    AlternateFrames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub upload_cadence: UploadCadence,
    pub stereo_rendering: bool,
    /// Passed through to the engine's volume update.
    pub lod_threshold: f32,
    /// Column-major volume world transform.
    pub world_transform: [f32; 16],
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            upload_cadence: UploadCadence::EveryFrame,
            stereo_rendering: false,
            lod_threshold: 1.0,
            world_transform: Mat4::IDENTITY.to_cols_array(),
        }
    }
}

impl MirrorConfig {
    pub fn from_toml_str(source: &str) -> MirrorResult<Self> {
        let config: MirrorConfig = toml::from_str(source).context("parsing mirror config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> MirrorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|error| MirrorError::IoError {
            path: path.display().to_string(),
            error: error.to_string(),
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!(
            "[MirrorConfig] Loaded {}: cadence={:?} stereo={} lod_threshold={}",
            path.display(),
            config.upload_cadence,
            config.stereo_rendering,
            config.lod_threshold
        );
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> MirrorResult<()> {
        if !(self.lod_threshold.is_finite() && self.lod_threshold > 0.0) {
            return Err(MirrorError::InvalidConfig {
                field: "lod_threshold".to_string(),
                value: self.lod_threshold.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        if self.world_transform.iter().any(|v| !v.is_finite()) {
            return Err(MirrorError::InvalidConfig {
                field: "world_transform".to_string(),
                value: format!("{:?}", self.world_transform),
                reason: "must contain only finite values".to_string(),
            });
        }
        if self.upload_cadence == UploadCadence::AlternateFrames && !self.stereo_rendering {
            log::warn!("[MirrorConfig] alternate_frames cadence has no effect without stereo_rendering");
        }
        Ok(())
    }

    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_cols_array(&self.world_transform)
    }

    /// Whether the render thread should drain the queue on `frame_index`.
    pub fn should_drain(&self, frame_index: u64) -> bool {
        match self.upload_cadence {
            UploadCadence::EveryFrame => true,
            UploadCadence::AlternateFrames => !self.stereo_rendering || frame_index % 2 == 0,
        }
    }
}

// config.rs — Tracker configuration.
//
// One explicit value replaces a process-wide parameter holder; whoever needs
// clip planes, scale or the overlay color gets a reference to it.
//
// Expected file (YAML, every key optional):
//
//   zn: 10.0
//   zf: 10000.0
//   scale: 1.0
//   qualityThreshold: 0.55
//   projDir: /data/project
//   color: "#72e090"
//   templateDistances: [200.0, 400.0, 600.0]
//
// A missing key is logged and the field keeps its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, TrackError};
use crate::image::Rgb8;
use crate::overlay::parse_hex_color;

/// Runtime parameters of the tracker and its presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Near clip plane.
    pub zn: f32,
    /// Far clip plane.
    pub zf: f32,
    /// Model scale factor.
    pub scale: f32,
    /// Tracking quality below which the object counts as lost, in `[0, 1]`.
    pub quality_threshold: f32,
    /// Project directory holding calibration, pose and model files.
    pub proj_dir: String,
    /// Overlay color literal, `#RRGGBB`.
    pub color: String,
    /// Object-to-camera distances for template generation.
    pub template_distances: Vec<f32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            zn: 10.0,
            zf: 10000.0,
            scale: 1.0,
            quality_threshold: 0.55,
            proj_dir: String::new(),
            color: "#72e090".to_string(),
            template_distances: vec![200.0, 400.0, 600.0],
        }
    }
}

/// File contents before defaults are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    zn: Option<f32>,
    zf: Option<f32>,
    scale: Option<f32>,
    quality_threshold: Option<f32>,
    proj_dir: Option<String>,
    color: Option<String>,
    template_distances: Option<Vec<f32>>,
}

fn take<T>(value: Option<T>, key: &str, field: &mut T) {
    match value {
        Some(v) => *field = v,
        None => warn!(key, "missing key in config file, keeping default"),
    }
}

impl TrackerConfig {
    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "parsing config file");
        let text = fs::read_to_string(path).map_err(|source| TrackError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse YAML text, starting from [`Default`].
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as a map.
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };

        let mut cfg = TrackerConfig::default();
        take(raw.zn, "zn", &mut cfg.zn);
        take(raw.zf, "zf", &mut cfg.zf);
        take(raw.scale, "scale", &mut cfg.scale);
        take(raw.proj_dir, "projDir", &mut cfg.proj_dir);
        take(raw.color, "color", &mut cfg.color);
        take(raw.template_distances, "templateDistances", &mut cfg.template_distances);

        match raw.quality_threshold {
            Some(q) if (0.0..=1.0).contains(&q) => cfg.quality_threshold = q,
            Some(q) => warn!(
                value = q,
                fallback = cfg.quality_threshold,
                "qualityThreshold outside [0, 1], keeping default"
            ),
            None => warn!(key = "qualityThreshold", "missing key in config file, keeping default"),
        }

        if parse_hex_color(&cfg.color).is_err() {
            warn!(color = %cfg.color, "config color is not #RRGGBB");
        }
        Ok(cfg)
    }

    /// Overlay color parsed from [`color`](Self::color).
    pub fn overlay_color(&self) -> Result<Rgb8> {
        parse_hex_color(&self.color)
    }

    /// `projDir` joined with a relative resource path.
    pub fn project_path(&self, relative: &str) -> PathBuf {
        Path::new(&self.proj_dir).join(relative)
    }

    /// Camera calibration file, read with [`CameraIntrinsics::from_file`].
    ///
    /// [`CameraIntrinsics::from_file`]: crate::camera::CameraIntrinsics::from_file
    pub fn calibration_path(&self) -> PathBuf {
        self.project_path("camera_calibration.yaml")
    }

    /// Initial object pose file, read with [`read_initial_pose`].
    ///
    /// [`read_initial_pose`]: crate::camera::read_initial_pose
    pub fn initial_pose_path(&self) -> PathBuf {
        self.project_path("Resources/initial_pose.yaml")
    }
}

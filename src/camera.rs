// camera.rs — Camera calibration and initial pose files.
//
// Handles:
// - Loading pinhole intrinsics and distortion from `camera_calibration.yaml`
// - Loading the 4×4 initial object pose from `Resources/initial_pose.yaml`
// - Pixel <-> normalized coordinate conversion
//
// Both files use the OpenCV FileStorage layout, where a matrix is a mapping:
//
//   %YAML:1.0
//   image_width: 640
//   image_height: 480
//   camera_matrix: !!opencv-matrix
//      rows: 3
//      cols: 3
//      dt: d
//      data: [ 500., 0., 320., 0., 500., 240., 0., 0., 1. ]
//   distortion_coefficients: !!opencv-matrix
//      rows: 1
//      cols: 5
//      dt: d
//      data: [ 0.1, -0.2, 0., 0., 0. ]
//
// The `%YAML:1.0` directive and the `!!opencv-matrix` tags are stripped
// before the text goes to serde_yaml. A shape error is reported as a parse
// error naming the offending key.

use std::fs;
use std::path::Path;

use nalgebra::Matrix3;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, TrackError};
use crate::object::Pose;

/// A `rows × cols` matrix node, data row-major.
#[derive(Debug, Deserialize)]
struct MatrixNode {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl MatrixNode {
    fn expect_shape(&self, key: &str, rows: usize, cols: usize) -> Result<()> {
        if self.rows != rows || self.cols != cols || self.data.len() != rows * cols {
            return Err(shape_error(format!(
                "{key}: expected a {rows}x{cols} matrix, got {}x{} with {} values",
                self.rows,
                self.cols,
                self.data.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationFile {
    image_width: u32,
    image_height: u32,
    camera_matrix: MatrixNode,
    distortion_coefficients: MatrixNode,
}

#[derive(Debug, Deserialize)]
struct PoseFile {
    initial_pose: MatrixNode,
}

fn shape_error(msg: String) -> TrackError {
    TrackError::ConfigParse(<serde_yaml::Error as serde::de::Error>::custom(msg))
}

/// Drop OpenCV-specific syntax that is not plain YAML.
fn strip_opencv_syntax(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('%'))
        .map(|line| line.replace("!!opencv-matrix", ""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_storage<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_yaml::from_str(&strip_opencv_syntax(text))?)
}

fn read_storage<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "reading storage file");
    let text = fs::read_to_string(path).map_err(|source| TrackError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_storage(&text)
}

/// Pinhole camera intrinsics with radial-tangential distortion.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntrinsics {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Camera matrix `[fx 0 cx; 0 fy cy; 0 0 1]`.
    pub k: Matrix3<f32>,
    /// Distortion coefficients `[k1, k2, p1, p2, k3]`.
    pub dist: [f32; 5],
}

impl CameraIntrinsics {
    /// Construct from explicit parameters (no distortion).
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        CameraIntrinsics {
            width,
            height,
            k: Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
            dist: [0.0; 5],
        }
    }

    /// Load from an OpenCV-style calibration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_raw(read_storage(path.as_ref())?)
    }

    /// Parse calibration text (see the module header for the layout).
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::from_raw(parse_storage(text)?)
    }

    fn from_raw(raw: CalibrationFile) -> Result<Self> {
        let m = &raw.camera_matrix;
        m.expect_shape("camera_matrix", 3, 3)?;

        // Skew and the bottom row are not used by the renderer.
        let mut cam = Self::new(
            m.data[0] as f32,
            m.data[4] as f32,
            m.data[2] as f32,
            m.data[5] as f32,
            raw.image_width,
            raw.image_height,
        );

        // k3 may be omitted.
        let d = &raw.distortion_coefficients;
        let n = d.data.len();
        if d.rows * d.cols != n || !(4..=5).contains(&n) {
            return Err(shape_error(format!(
                "distortion_coefficients: expected 4 or 5 values, got {}x{} with {n}",
                d.rows, d.cols
            )));
        }
        for (slot, &v) in cam.dist.iter_mut().zip(&d.data) {
            *slot = v as f32;
        }
        Ok(cam)
    }

    pub fn fx(&self) -> f32 {
        self.k[(0, 0)]
    }

    pub fn fy(&self) -> f32 {
        self.k[(1, 1)]
    }

    pub fn cx(&self) -> f32 {
        self.k[(0, 2)]
    }

    pub fn cy(&self) -> f32 {
        self.k[(1, 2)]
    }

    /// Pixel `(u, v)` to normalized coordinates, `K^{-1} [u, v, 1]^T`.
    /// Does not undistort.
    pub fn normalize(&self, u: f32, v: f32) -> (f32, f32) {
        ((u - self.cx()) / self.fx(), (v - self.cy()) / self.fy())
    }

    /// Normalized coordinates back to pixels.
    pub fn denormalize(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.fx() + self.cx(), y * self.fy() + self.cy())
    }
}

/// Load the `initial_pose` 4×4 matrix from an OpenCV-style file.
pub fn read_initial_pose(path: impl AsRef<Path>) -> Result<Pose> {
    pose_from_raw(read_storage(path.as_ref())?)
}

/// Parse the `initial_pose` 4×4 matrix from text.
pub fn parse_initial_pose(text: &str) -> Result<Pose> {
    pose_from_raw(parse_storage(text)?)
}

fn pose_from_raw(raw: PoseFile) -> Result<Pose> {
    raw.initial_pose.expect_shape("initial_pose", 4, 4)?;
    let data: Vec<f32> = raw.initial_pose.data.iter().map(|&v| v as f32).collect();
    Ok(Pose::from_row_slice(&data))
}

// tests/test_config.rs — Loading tracker configuration from disk.

use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;

use regiontrack::camera::{read_initial_pose, CameraIntrinsics};
use regiontrack::config::TrackerConfig;
use regiontrack::object::{Model, ObjectId, TrackedObject};
use regiontrack::overlay::DEFAULT_OVERLAY_COLOR;
use regiontrack::template::{DescriptorFactory, TemplateDescriptor};
use regiontrack::TrackError;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("regiontrack-{}-{name}", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn load_partial_file() {
    let path = write_temp("partial.yaml", "zn: 1.5\nprojDir: /srv/scenes/mug\ntemplateDistances: [350]\n");
    let cfg = TrackerConfig::from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(cfg.zn, 1.5);
    assert_eq!(cfg.zf, 10000.0);
    assert_eq!(cfg.overlay_color().unwrap(), DEFAULT_OVERLAY_COLOR);
    assert_eq!(cfg.project_path("pose.txt"), PathBuf::from("/srv/scenes/mug/pose.txt"));
    assert_eq!(cfg.template_distances, vec![350.0]);
}

#[test]
fn configured_distances_drive_template_generation() {
    let path = write_temp("dist.yaml", "qualityThreshold: 0.4\ntemplateDistances: [200, 600]\n");
    let cfg = TrackerConfig::from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    let model = Model::from_euler(ObjectId(2), [0.0, 0.0, 500.0], [0.0, 0.0, 0.0], cfg.scale);
    let mut obj: TrackedObject<TemplateDescriptor> =
        TrackedObject::new(model, cfg.quality_threshold, cfg.template_distances.clone());
    obj.generate_templates(&mut DescriptorFactory).unwrap();

    assert_eq!(obj.quality_threshold(), 0.4);
    assert_eq!(obj.templates().unwrap().base().len(), 12 * 4 * 2);
}

// ===== Project directory =====

const CALIBRATION: &str = "%YAML:1.0
---
image_width: 752
image_height: 480
camera_matrix: !!opencv-matrix
   rows: 3
   cols: 3
   dt: d
   data: [ 458.654, 0., 367.215, 0., 457.296, 248.375, 0., 0., 1. ]
distortion_coefficients: !!opencv-matrix
   rows: 1
   cols: 5
   dt: d
   data: [ -0.2834, 0.0739, 0.0002, 0.00002, 0. ]
";

const INITIAL_POSE: &str = "%YAML:1.0
---
initial_pose: !!opencv-matrix
   rows: 4
   cols: 4
   dt: d
   data: [ 0., -1., 0., 15.,
           1., 0., 0., -5.,
           0., 0., 1., 450.,
           0., 0., 0., 1. ]
";

/// Project directory laid out the way the tracker expects.
fn make_project(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("regiontrack-{}-{name}", std::process::id()));
    fs::create_dir_all(dir.join("Resources")).unwrap();
    fs::write(dir.join("camera_calibration.yaml"), CALIBRATION).unwrap();
    fs::write(dir.join("Resources/initial_pose.yaml"), INITIAL_POSE).unwrap();
    dir
}

#[test]
fn load_calibration_and_pose_from_project() {
    let dir = make_project("project");
    let cfg = TrackerConfig::from_yaml_str(&format!("projDir: {}\nscale: 2.0\n", dir.display())).unwrap();

    let cam = CameraIntrinsics::from_file(cfg.calibration_path()).unwrap();
    let pose = read_initial_pose(cfg.initial_pose_path()).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!((cam.width, cam.height), (752, 480));
    assert_relative_eq!(cam.fx(), 458.654);
    assert_relative_eq!(cam.cy(), 248.375);
    assert_relative_eq!(cam.dist[0], -0.2834);

    let model = Model::new(ObjectId(1), pose, cfg.scale);
    assert_eq!(model.pose(), &pose);
    assert_eq!(model.initial_pose()[(0, 1)], -1.0);
    assert_eq!(model.initial_pose()[(1, 0)], 1.0);
    assert_eq!(model.initial_pose()[(2, 3)], 450.0);
    assert_eq!(model.scale(), 2.0);
}

#[test]
fn missing_calibration_file_is_io_error() {
    let cfg = TrackerConfig::from_yaml_str("projDir: /nonexistent/regiontrack-project\n").unwrap();
    assert!(matches!(
        CameraIntrinsics::from_file(cfg.calibration_path()),
        Err(TrackError::ConfigIo { .. })
    ));
    assert!(matches!(
        read_initial_pose(cfg.initial_pose_path()),
        Err(TrackError::ConfigIo { .. })
    ));
}

#[test]
fn truncated_pose_is_parse_error() {
    let path = write_temp("short_pose.yaml", "initial_pose:\n  rows: 4\n  cols: 4\n  data: [1, 0, 0, 0]\n");
    let err = read_initial_pose(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(matches!(err, TrackError::ConfigParse(_)));
}

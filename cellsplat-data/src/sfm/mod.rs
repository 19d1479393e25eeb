//! Structure-from-motion scene files.
//!
//! A scene directory holds two binary files: [`POINTS_FILE`] with the sparse
//! point cloud and [`CAMERAS_FILE`] with one pose record per registered image.
//! Camera intrinsics ([`INTRINSICS_FILE`]) are never decoded here.

mod cameras;
mod points;

pub use cameras::{read_cameras, write_cameras};
pub use points::{read_points3d, write_points3d};

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::codec::DecodeError;
use crate::types::Scene;

pub const POINTS_FILE: &str = "points3D.bin";
pub const CAMERAS_FILE: &str = "images.bin";
pub const INTRINSICS_FILE: &str = "cameras.bin";

/// Errors raised while loading or saving a scene directory.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SceneError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn decode(path: &Path) -> impl FnOnce(DecodeError) -> Self + '_ {
        move |source| SceneError::Decode {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Load the points and cameras of a scene directory.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn load_scene(dir: impl AsRef<Path>) -> Result<Scene, SceneError> {
    let dir = dir.as_ref();

    let points_path = dir.join(POINTS_FILE);
    debug!("Loading points from: {}", points_path.display());
    let file = File::open(&points_path).map_err(SceneError::io(&points_path))?;
    let points = read_points3d(BufReader::new(file)).map_err(SceneError::decode(&points_path))?;

    let cameras_path = dir.join(CAMERAS_FILE);
    debug!("Loading cameras from: {}", cameras_path.display());
    let file = File::open(&cameras_path).map_err(SceneError::io(&cameras_path))?;
    let cameras =
        read_cameras(BufReader::new(file)).map_err(SceneError::decode(&cameras_path))?;

    info!(
        "Scene loaded: {} points, {} cameras",
        points.len(),
        cameras.len()
    );
    Ok(Scene { points, cameras })
}

/// Write a scene into `dir`, creating the directory if needed.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn save_scene(dir: impl AsRef<Path>, scene: &Scene) -> Result<(), SceneError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(SceneError::io(dir))?;

    let points_path = dir.join(POINTS_FILE);
    let file = File::create(&points_path).map_err(SceneError::io(&points_path))?;
    let mut writer = BufWriter::new(file);
    write_points3d(&mut writer, &scene.points)
        .and_then(|_| writer.flush())
        .map_err(SceneError::io(&points_path))?;

    let cameras_path = dir.join(CAMERAS_FILE);
    let file = File::create(&cameras_path).map_err(SceneError::io(&cameras_path))?;
    let mut writer = BufWriter::new(file);
    write_cameras(&mut writer, &scene.cameras)
        .and_then(|_| writer.flush())
        .map_err(SceneError::io(&cameras_path))?;

    debug!(
        "Scene written: {} points, {} cameras",
        scene.points.len(),
        scene.cameras.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Camera, Point3D};
    use glam::{DQuat, DVec3};

    fn single_scene() -> Scene {
        let mut scene = Scene::default();
        scene.cameras.insert(
            0,
            Camera::new(DQuat::from_xyzw(0.0, 0.0, 0.0, 1.0), DVec3::ZERO, 0, "img0"),
        );
        scene.points.insert(
            7,
            Point3D::new(DVec3::new(1.0, 2.0, 3.0), [10, 20, 30], 0.5).with_observation(0, 0),
        );
        scene
    }

    #[test]
    fn test_export_and_reload_single_camera_scene() {
        let dir = tempfile::tempdir().unwrap();
        let scene = single_scene();
        save_scene(dir.path(), &scene).unwrap();

        let loaded = load_scene(dir.path()).unwrap();
        assert_eq!(loaded, scene);

        let cam = &loaded.cameras[&0];
        assert_eq!(cam.name, "img0");
        assert_eq!([cam.rotation.w, cam.rotation.x, cam.rotation.y, cam.rotation.z], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(cam.translation, DVec3::ZERO);

        let point = &loaded.points[&7];
        assert_eq!(point.position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(point.color, [10, 20, 30]);
        assert_eq!(point.error, 0.5);
        assert_eq!(point.track.len(), 1);
        assert_eq!((point.track[0].camera_id, point.track[0].point2d_idx), (0, 0));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_scene(dir.path().join("nope")).unwrap_err();
        match err {
            SceneError::Io { path, .. } => assert!(path.ends_with(POINTS_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        save_scene(dir.path(), &single_scene()).unwrap();
        let cameras_path = dir.path().join(CAMERAS_FILE);
        let bytes = std::fs::read(&cameras_path).unwrap();
        std::fs::write(&cameras_path, &bytes[..bytes.len() - 3]).unwrap();

        let err = load_scene(dir.path()).unwrap_err();
        assert!(matches!(err, SceneError::Decode { ref path, .. } if path == &cameras_path));
        assert!(err.to_string().contains("record 0"));
    }
}

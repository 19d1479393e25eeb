//! Core data types for reconstruction scenes and Gaussian splats.
//!
//! These are the in-memory forms of the structure-from-motion scene
//! (points + cameras) and of a trained Gaussian asset. The codecs in
//! [`crate::sfm`] and [`crate::ply`] translate them to and from disk.

use std::collections::BTreeMap;

use glam::{DQuat, DVec2, DVec3, Vec3};

/// Point3D id stored in a camera observation that has no 3D point.
pub const NO_POINT3D: i64 = -1;

/// One observation of a 3D point: which camera saw it, and which of that
/// camera's 2D points it corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackElement {
    pub camera_id: u32,
    pub point2d_idx: u32,
}

impl TrackElement {
    pub fn new(camera_id: u32, point2d_idx: u32) -> Self {
        Self {
            camera_id,
            point2d_idx,
        }
    }
}

/// A triangulated 3D point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point3D {
    /// Position in world space.
    pub position: DVec3,
    /// RGB color (0-255).
    pub color: [u8; 3],
    /// Mean reprojection error.
    pub error: f64,
    /// Ordered list of observations.
    pub track: Vec<TrackElement>,
}

impl Point3D {
    /// Create a new point with an empty track.
    pub fn new(position: DVec3, color: [u8; 3], error: f64) -> Self {
        Self {
            position,
            color,
            error,
            track: Vec::new(),
        }
    }

    /// Add an observation to the track.
    pub fn with_observation(mut self, camera_id: u32, point2d_idx: u32) -> Self {
        self.track.push(TrackElement::new(camera_id, point2d_idx));
        self
    }
}

/// A 2D keypoint in an image and the 3D point it was triangulated into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub xy: DVec2,
    /// Raw id as stored on disk; negative means no 3D point.
    pub point3d_id: i64,
}

impl Observation {
    pub fn new(xy: DVec2, point3d_id: i64) -> Self {
        Self { xy, point3d_id }
    }

    /// Keypoint without a triangulated point.
    pub fn untracked(xy: DVec2) -> Self {
        Self::new(xy, NO_POINT3D)
    }

    /// The referenced 3D point, if any.
    pub fn point3d(&self) -> Option<u64> {
        u64::try_from(self.point3d_id).ok()
    }
}

/// A registered image: pose, intrinsics reference, name and keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World-to-camera rotation. Stored on disk as (w, x, y, z).
    pub rotation: DQuat,
    /// World-to-camera translation.
    pub translation: DVec3,
    /// Id of the intrinsics model this image was taken with.
    pub model_id: u32,
    /// Image file name.
    pub name: String,
    pub observations: Vec<Observation>,
}

impl Camera {
    /// Create a new camera without observations.
    pub fn new(rotation: DQuat, translation: DVec3, model_id: u32, name: impl Into<String>) -> Self {
        Self {
            rotation,
            translation,
            model_id,
            name: name.into(),
            observations: Vec::new(),
        }
    }

    /// Camera centre in world space (`-R^-1 * t`).
    pub fn center(&self) -> DVec3 {
        -(self.rotation.inverse() * self.translation)
    }
}

/// A reconstruction scene: 3D points and the cameras that observed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub points: BTreeMap<u64, Point3D>,
    pub cameras: BTreeMap<u32, Camera>,
}

impl Scene {
    pub fn new(points: BTreeMap<u64, Point3D>, cameras: BTreeMap<u32, Camera>) -> Self {
        Self { points, cameras }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.cameras.is_empty()
    }

    /// Number of track entries naming a camera that is not part of the scene.
    pub fn dangling_track_entries(&self) -> usize {
        self.points
            .values()
            .flat_map(|p| p.track.iter())
            .filter(|el| !self.cameras.contains_key(&el.camera_id))
            .count()
    }
}

/// Number of `f32` values in one splat record.
pub const SPLAT_FLOATS: usize = 62;

/// Size in bytes of one splat record on disk.
pub const SPLAT_RECORD_SIZE: usize = SPLAT_FLOATS * 4;

/// A trained 3D Gaussian splat, laid out exactly like its on-disk record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Splat {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Degree-0 spherical harmonics coefficients (one per channel).
    pub color_dc: [f32; 3],
    /// Higher-order spherical harmonics: 15 coefficients x 3 channels.
    pub color_rest: [f32; 45],
    /// Pre-activation opacity.
    pub opacity: f32,
    /// Log-scale per axis.
    pub scale: [f32; 3],
    /// Rotation quaternion (w, x, y, z).
    pub rotation: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Splat>() == SPLAT_RECORD_SIZE);

impl Splat {
    /// Create a splat at a position with all other attributes zeroed and an
    /// identity rotation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
            rotation: [1.0, 0.0, 0.0, 0.0],
            ..bytemuck::Zeroable::zeroed()
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Flatten to the 62 floats in record order.
    pub fn to_floats(self) -> [f32; SPLAT_FLOATS] {
        bytemuck::cast(self)
    }

    /// Rebuild from 62 floats in record order.
    pub fn from_floats(floats: [f32; SPLAT_FLOATS]) -> Self {
        bytemuck::cast(floats)
    }
}

impl Default for Splat {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_sentinel() {
        let tracked = Observation::new(DVec2::new(1.0, 2.0), 42);
        assert_eq!(tracked.point3d(), Some(42));

        let untracked = Observation::untracked(DVec2::ZERO);
        assert_eq!(untracked.point3d_id, NO_POINT3D);
        assert_eq!(untracked.point3d(), None);
    }

    #[test]
    fn test_camera_center_identity_rotation() {
        let cam = Camera::new(DQuat::IDENTITY, DVec3::new(1.0, -2.0, 3.0), 1, "a.jpg");
        assert_eq!(cam.center(), DVec3::new(-1.0, 2.0, -3.0));
    }

    #[test]
    fn test_dangling_track_entries() {
        let mut scene = Scene::default();
        scene
            .cameras
            .insert(1, Camera::new(DQuat::IDENTITY, DVec3::ZERO, 1, "a.jpg"));
        scene.points.insert(
            10,
            Point3D::new(DVec3::ZERO, [0, 0, 0], 0.1)
                .with_observation(1, 0)
                .with_observation(2, 0)
                .with_observation(3, 5),
        );
        assert_eq!(scene.dangling_track_entries(), 2);
    }

    #[test]
    fn test_splat_float_layout() {
        let mut splat = Splat::at(Vec3::new(1.0, 2.0, 3.0));
        splat.normal = [4.0, 5.0, 6.0];
        splat.color_dc = [7.0, 8.0, 9.0];
        splat.color_rest[44] = 10.0;
        splat.opacity = 11.0;
        splat.scale = [12.0, 13.0, 14.0];
        splat.rotation = [15.0, 16.0, 17.0, 18.0];

        let floats = splat.to_floats();
        assert_eq!(&floats[..9], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(floats[53], 10.0);
        assert_eq!(floats[54], 11.0);
        assert_eq!(&floats[55..], &[12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0]);
        assert_eq!(Splat::from_floats(floats), splat);
    }
}

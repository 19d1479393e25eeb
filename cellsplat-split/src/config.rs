//! Partitioning configuration.

use std::path::{Path, PathBuf};

use cellsplat_data::{Camera, GroundPlane, Point3D};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid threshold {name} = {value}: must be finite and non-negative")]
    Threshold { name: &'static str, value: f64 },
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    Grid { rows: u32, cols: u32 },
}

/// Which entity is binned into cells; the other is cross-referenced through
/// point tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Points are binned; cameras follow the points they observe.
    #[default]
    Points,
    /// Cameras are binned; points follow the cameras that observe them.
    Cameras,
}

/// How a camera's world position is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// The stored translation vector, as-is.
    #[default]
    Translation,
    /// The camera centre `-R^-1 * t`.
    Center,
}

/// Strategy for assigning scene entities to grid cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentStrategy {
    pub driver: Driver,
    pub camera_position: CameraPosition,
}

impl AssignmentStrategy {
    pub fn point_position(&self, point: &Point3D) -> DVec3 {
        point.position
    }

    pub fn camera_position(&self, camera: &Camera) -> DVec3 {
        match self.camera_position {
            CameraPosition::Translation => camera.translation,
            CameraPosition::Center => camera.center(),
        }
    }
}

/// Empirical pruning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A camera whose observations in a cell divided by the cell's point
    /// count fall below this is pruned from the cell.
    pub min_camera_frequency: f64,
    /// Cells with more cameras per point than this are dropped.
    pub max_camera_point_ratio: f64,
    /// Cells with fewer points than this are dropped.
    pub min_points: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_camera_frequency: 0.003,
            max_camera_point_ratio: 0.5,
            min_points: 10,
        }
    }
}

/// Full configuration of a split run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub rows: u32,
    pub cols: u32,
    pub plane: GroundPlane,
    pub strategy: AssignmentStrategy,
    pub thresholds: Thresholds,
    /// Drop references to entities outside the cell so every exported cell
    /// is self-contained.
    pub trim_references: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            plane: GroundPlane::default(),
            strategy: AssignmentStrategy::default(),
            thresholds: Thresholds::default(),
            trim_references: false,
        }
    }
}

impl SplitConfig {
    pub fn with_grid(mut self, rows: u32, cols: u32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_driver(mut self, driver: Driver) -> Self {
        self.strategy.driver = driver;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::Grid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for (name, value) in [
            ("min_camera_frequency", self.thresholds.min_camera_frequency),
            ("max_camera_point_ratio", self.thresholds.max_camera_point_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;

    #[test]
    fn test_defaults() {
        let config = SplitConfig::default();
        assert_eq!(config.thresholds.min_camera_frequency, 0.003);
        assert_eq!(config.thresholds.max_camera_point_ratio, 0.5);
        assert_eq!(config.thresholds.min_points, 10);
        assert_eq!(config.plane, GroundPlane::XZ);
        assert_eq!(config.strategy.driver, Driver::Points);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SplitConfig = serde_json::from_str(
            r#"{ "rows": 3, "strategy": { "driver": "cameras" }, "thresholds": { "min_points": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.rows, 3);
        assert_eq!(config.cols, 2);
        assert_eq!(config.strategy.driver, Driver::Cameras);
        assert_eq!(config.strategy.camera_position, CameraPosition::Translation);
        assert_eq!(config.thresholds.min_points, 4);
        assert_eq!(config.thresholds.max_camera_point_ratio, 0.5);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            SplitConfig::default().with_grid(0, 3).validate(),
            Err(ConfigError::Grid { rows: 0, cols: 3 })
        ));

        let mut thresholds = Thresholds::default();
        thresholds.max_camera_point_ratio = f64::NAN;
        assert!(matches!(
            SplitConfig::default().with_thresholds(thresholds).validate(),
            Err(ConfigError::Threshold { name: "max_camera_point_ratio", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("split.json");
        std::fs::write(&path, r#"{ "cols": 5, "plane": "xy" }"#).unwrap();
        let config = SplitConfig::load(&path).unwrap();
        assert_eq!((config.rows, config.cols), (2, 5));
        assert_eq!(config.plane, GroundPlane::XY);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SplitConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_camera_position_modes() {
        let cam = Camera::new(DQuat::IDENTITY, DVec3::new(1.0, 2.0, 3.0), 1, "c");
        let translation = AssignmentStrategy::default();
        assert_eq!(translation.camera_position(&cam), DVec3::new(1.0, 2.0, 3.0));
        let center = AssignmentStrategy {
            camera_position: CameraPosition::Center,
            ..Default::default()
        };
        assert_eq!(center.camera_position(&cam), DVec3::new(-1.0, -2.0, -3.0));
    }
}

//! Cellsplat Split Crate
//!
//! Partitions a structure-from-motion scene into a grid of cells on the
//! ground plane and exports every usable cell as a standalone scene, so each
//! cell can be trained independently and merged back afterwards.
//!
//! ## Modules
//!
//! - [`config`]: grid size, ground plane, assignment strategy and thresholds
//! - [`partition`]: binning, camera pruning and cell rejection
//! - [`export`]: per-cell scene directories and the cell-boundary table

pub mod config;
pub mod export;
pub mod partition;

pub use config::{AssignmentStrategy, CameraPosition, ConfigError, Driver, SplitConfig, Thresholds};
pub use export::{CellExporter, ExportError};
pub use partition::{
    CellScene, DropReason, DroppedCell, Partition, PartitionError, PartitionReport,
    ScenePartitioner, partition, trim_references,
};

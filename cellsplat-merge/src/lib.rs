//! Cellsplat Merge Crate
//!
//! Reassembles per-cell Gaussian assets into one global asset. Each cell's
//! splats are culled to the cell's recorded boundary so content that bled
//! across seams during independent training is not duplicated.

pub mod loader;
pub mod merger;

use std::path::PathBuf;

use cellsplat_data::{CellTableError, GridPos, PlyError};
use thiserror::Error;

pub use loader::{DEFAULT_EXTENSION, asset_cell, load_cell_splats};
pub use merger::{AssetMerger, CellMergeStats, MergeOutput, MergeReport, cull};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read asset directory {}: {source}", path.display())]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cell {pos} has two assets: {} and {}", first.display(), second.display())]
    DuplicateCell {
        pos: GridPos,
        first: PathBuf,
        second: PathBuf,
    },
    #[error(transparent)]
    Asset(#[from] PlyError),
    #[error("failed to read cell table: {0}")]
    Table(#[from] CellTableError),
}

//! Cellsplat Data Crate
//!
//! Scene model and file formats for partitioned Gaussian splatting:
//!
//! - [`types`]: reconstruction scenes (points + cameras) and Gaussian splats
//! - [`grid`]: ground-plane grid, cells and bounding boxes
//! - [`sfm`]: binary structure-from-motion scene files
//! - [`ply`]: Gaussian asset files
//! - [`cells`]: the plain-text cell-boundary table

mod codec;

pub mod cells;
pub mod grid;
pub mod ply;
pub mod sfm;
pub mod types;

pub use cells::{CELL_TABLE_FILE, CellTable, CellTableError};
pub use codec::{DecodeError, Location};
pub use grid::{Bounds2, Cell, EmptyGridError, Grid, GridPos, GroundPlane, ParseGridPosError};
pub use ply::{PlyError, load_splats, save_splats};
pub use sfm::{SceneError, load_scene, save_scene};
pub use types::{
    Camera, NO_POINT3D, Observation, Point3D, SPLAT_FLOATS, SPLAT_RECORD_SIZE, Scene, Splat,
    TrackElement,
};

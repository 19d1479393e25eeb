//! Command-line arguments.

use std::path::PathBuf;

use cellsplat_data::GroundPlane;
use cellsplat_split::{CameraPosition, Driver};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

/// Cellsplat - partition reconstruction scenes and merge per-cell splats
#[derive(Parser, Debug)]
#[command(name = "cellsplat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Partition a scene into grid cells and export each cell
    Split(SplitArgs),
    /// Merge per-cell splat assets into one file
    Merge(MergeArgs),
    /// Print scene statistics
    Inspect(InspectArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SplitArgs {
    /// Scene directory holding points3D.bin and images.bin
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output root for the cell directories and the cell table
    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON split configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub rows: Option<u32>,

    #[arg(long)]
    pub cols: Option<u32>,

    /// Entity binned into cells
    #[arg(long, value_enum)]
    pub driver: Option<DriverArg>,

    /// How camera positions are derived
    #[arg(long, value_enum)]
    pub camera_position: Option<CameraPositionArg>,

    /// Ground plane (xy, xz or yz)
    #[arg(long)]
    pub plane: Option<GroundPlane>,

    /// Do not write the cell-boundary table
    #[arg(long)]
    pub no_table: bool,

    /// Drop references to points and cameras outside each cell
    #[arg(long)]
    pub trim_references: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MergeArgs {
    /// Directory of <row>_<col> splat assets
    #[arg(short, long)]
    pub assets: PathBuf,

    /// Cell-boundary table written by `split`
    #[arg(short, long)]
    pub cells: PathBuf,

    /// Merged asset to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Ground plane (xy, xz or yz)
    #[arg(long, default_value = "xz")]
    pub plane: GroundPlane,

    /// Extension of the per-cell asset files
    #[arg(long, default_value = cellsplat_merge::DEFAULT_EXTENSION)]
    pub extension: String,
}

#[derive(ClapArgs, Debug)]
pub struct InspectArgs {
    /// Scene directory holding points3D.bin and images.bin
    #[arg(short, long)]
    pub input: PathBuf,

    /// Ground plane used for the reported bounds
    #[arg(long, default_value = "xz")]
    pub plane: GroundPlane,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverArg {
    Points,
    Cameras,
}

impl From<DriverArg> for Driver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Points => Driver::Points,
            DriverArg::Cameras => Driver::Cameras,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraPositionArg {
    Translation,
    Center,
}

impl From<CameraPositionArg> for CameraPosition {
    fn from(arg: CameraPositionArg) -> Self {
        match arg {
            CameraPositionArg::Translation => CameraPosition::Translation,
            CameraPositionArg::Center => CameraPosition::Center,
        }
    }
}

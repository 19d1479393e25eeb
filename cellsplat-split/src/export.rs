//! Writing partitioned cells to disk.
//!
//! Every surviving cell becomes its own scene directory under the output
//! root, `<root>/<row>_<col>/sparse/0/`, and the boundaries of all surviving
//! cells go into one [`CELL_TABLE_FILE`] at the root.

use std::path::{Path, PathBuf};

use cellsplat_data::sfm::INTRINSICS_FILE;
use cellsplat_data::{CELL_TABLE_FILE, CellTableError, GridPos, SceneError, save_scene};
use thiserror::Error;
use tracing::{debug, info};

use crate::partition::Partition;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to export cell {pos}: {source}")]
    Cell {
        pos: GridPos,
        #[source]
        source: SceneError,
    },
    #[error("failed to copy intrinsics into cell {pos} ({}): {source}", path.display())]
    Intrinsics {
        pos: GridPos,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cell table: {0}")]
    Table(#[from] CellTableError),
}

/// Writes each cell of a [`Partition`] as a standalone scene directory.
#[derive(Debug, Clone)]
pub struct CellExporter {
    root: PathBuf,
    intrinsics: Option<PathBuf>,
    write_table: bool,
}

impl CellExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            intrinsics: None,
            write_table: true,
        }
    }

    /// Copy this intrinsics file into every cell directory.
    pub fn with_intrinsics(mut self, path: impl Into<PathBuf>) -> Self {
        self.intrinsics = Some(path.into());
        self
    }

    /// Use the intrinsics file of an input scene directory, if it has one.
    pub fn with_intrinsics_from(self, scene_dir: &Path) -> Self {
        let path = scene_dir.join(INTRINSICS_FILE);
        if path.is_file() {
            self.with_intrinsics(path)
        } else {
            debug!("No {} in {}", INTRINSICS_FILE, scene_dir.display());
            self
        }
    }

    pub fn with_table(mut self, write_table: bool) -> Self {
        self.write_table = write_table;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cell_dir(&self, pos: GridPos) -> PathBuf {
        self.root.join(pos.to_string()).join("sparse").join("0")
    }

    pub fn table_path(&self) -> PathBuf {
        self.root.join(CELL_TABLE_FILE)
    }

    /// Export all surviving cells and return their directories.
    #[tracing::instrument(skip_all, fields(root = %self.root.display()))]
    pub fn export(&self, partition: &Partition) -> Result<Vec<PathBuf>, ExportError> {
        let mut dirs = Vec::with_capacity(partition.cells.len());

        for cell in &partition.cells {
            let dir = self.cell_dir(cell.pos);
            save_scene(&dir, &cell.scene).map_err(|source| ExportError::Cell {
                pos: cell.pos,
                source,
            })?;

            if let Some(src) = &self.intrinsics {
                let dst = dir.join(INTRINSICS_FILE);
                std::fs::copy(src, &dst).map_err(|source| ExportError::Intrinsics {
                    pos: cell.pos,
                    path: dst,
                    source,
                })?;
            }

            debug!("Exported cell {} to {}", cell.pos, dir.display());
            dirs.push(dir);
        }

        if self.write_table {
            std::fs::create_dir_all(&self.root).map_err(|source| CellTableError::Io {
                path: self.root.clone(),
                source,
            })?;
            partition.cell_table().save(self.table_path())?;
        }

        info!("Exported {} cells", dirs.len());
        Ok(dirs)
    }
}

//! Discovery of per-cell asset files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cellsplat_data::{GridPos, Splat, load_splats};
use tracing::{debug, info, warn};

use crate::MergeError;

pub const DEFAULT_EXTENSION: &str = "ply";

/// Grid position encoded in an asset filename such as `1_2.ply`.
pub fn asset_cell(path: &Path, extension: &str) -> Option<GridPos> {
    if path.extension()? != extension {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Load every `<row>_<col>.<extension>` file in `dir`. Files that do not
/// follow the naming scheme are skipped. Two files naming the same cell, or a
/// file that fails to decode, abort the load.
#[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn load_cell_splats(
    dir: impl AsRef<Path>,
    extension: &str,
) -> Result<BTreeMap<GridPos, Vec<Splat>>, MergeError> {
    let dir = dir.as_ref();
    let dir_err = |source| MergeError::Dir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_err)? {
        let path = entry.map_err(dir_err)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sources: BTreeMap<GridPos, PathBuf> = BTreeMap::new();
    for path in paths {
        let Some(pos) = asset_cell(&path, extension) else {
            warn!("Skipping {}: not a <row>_<col>.{} asset", path.display(), extension);
            continue;
        };
        if let Some(first) = sources.get(&pos) {
            return Err(MergeError::DuplicateCell {
                pos,
                first: first.clone(),
                second: path,
            });
        }
        sources.insert(pos, path);
    }

    let mut cells = BTreeMap::new();
    for (pos, path) in sources {
        debug!("Cell {} from {}", pos, path.display());
        cells.insert(pos, load_splats(&path)?);
    }

    info!("Loaded assets for {} cells", cells.len());
    Ok(cells)
}

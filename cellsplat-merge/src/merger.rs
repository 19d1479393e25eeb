//! Culling and concatenation of per-cell splats.

use std::collections::BTreeMap;
use std::path::Path;

use cellsplat_data::{Bounds2, CellTable, GridPos, GroundPlane, Splat};
use tracing::{debug, info, warn};

use crate::MergeError;
use crate::loader::load_cell_splats;

/// Splat counts of one cell before and after culling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellMergeStats {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub cells: BTreeMap<GridPos, CellMergeStats>,
    /// Cells with assets but no recorded boundary.
    pub skipped: Vec<GridPos>,
}

impl MergeReport {
    pub fn kept(&self) -> usize {
        self.cells.values().map(|s| s.after).sum()
    }

    pub fn culled(&self) -> usize {
        self.cells.values().map(|s| s.before - s.after).sum()
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub splats: Vec<Splat>,
    pub report: MergeReport,
}

/// Keep the splats whose ground-plane position lies in `[min, max)`.
pub fn cull(mut splats: Vec<Splat>, bounds: &Bounds2, plane: GroundPlane) -> Vec<Splat> {
    splats.retain(|s| bounds.contains(plane.project(s.position().as_dvec3())));
    splats
}

/// Merges per-cell splats against a cell-boundary table.
pub struct AssetMerger {
    table: CellTable,
    plane: GroundPlane,
}

impl AssetMerger {
    pub fn new(table: CellTable, plane: GroundPlane) -> Self {
        Self { table, plane }
    }

    pub fn table(&self) -> &CellTable {
        &self.table
    }

    /// Cull every cell to its boundary and concatenate in grid order. Cells
    /// missing from the table are skipped.
    #[tracing::instrument(skip_all, fields(cells = cells.len()))]
    pub fn merge(&self, cells: BTreeMap<GridPos, Vec<Splat>>) -> MergeOutput {
        let mut report = MergeReport::default();
        let mut splats = Vec::new();

        for (pos, cell_splats) in cells {
            let Some(bounds) = self.table.get(pos) else {
                warn!(
                    "Cell {} has no recorded boundary; skipping {} splats",
                    pos,
                    cell_splats.len()
                );
                report.skipped.push(pos);
                continue;
            };

            let before = cell_splats.len();
            let kept = cull(cell_splats, bounds, self.plane);
            debug!("Cell {}: kept {} of {} splats", pos, kept.len(), before);
            report.cells.insert(
                pos,
                CellMergeStats {
                    before,
                    after: kept.len(),
                },
            );
            splats.extend(kept);
        }

        info!(
            "Merged {} splats from {} cells ({} culled, {} cells skipped)",
            splats.len(),
            report.cells.len(),
            report.culled(),
            report.skipped.len()
        );
        MergeOutput { splats, report }
    }

    /// Load `<row>_<col>.<extension>` assets from `dir` and merge them.
    pub fn merge_dir(
        &self,
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> Result<MergeOutput, MergeError> {
        let cells = load_cell_splats(dir, extension)?;
        Ok(self.merge(cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec2, Vec3};

    fn table() -> CellTable {
        let mut table = CellTable::new();
        table.insert(
            GridPos::new(0, 0),
            Bounds2::new(DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0)),
        );
        table.insert(
            GridPos::new(0, 1),
            Bounds2::new(DVec2::new(1.0, 0.0), DVec2::new(2.0, 1.0)),
        );
        table
    }

    fn splat(x: f32, z: f32) -> Splat {
        Splat::at(Vec3::new(x, 100.0, z))
    }

    #[test]
    fn test_cull_half_open() {
        let bounds = Bounds2::new(DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0));
        let kept = cull(
            vec![
                splat(0.0, 0.0),
                splat(0.5, 0.999),
                splat(1.0, 0.5),
                splat(0.5, 1.0),
                splat(-0.1, 0.5),
                splat(f32::NAN, 0.5),
            ],
            &bounds,
            GroundPlane::XZ,
        );
        assert_eq!(kept, vec![splat(0.0, 0.0), splat(0.5, 0.999)]);
    }

    #[test]
    fn test_outer_max_edge_is_culled() {
        // Cell 0_1 is the last column and the top row of its grid; the split
        // assigns content on x = 2 or z = 1 to it, the merge does not keep it.
        let mut cells = BTreeMap::new();
        cells.insert(
            GridPos::new(0, 1),
            vec![splat(2.0, 0.5), splat(1.5, 1.0), splat(1.5, 0.5)],
        );
        let output = AssetMerger::new(table(), GroundPlane::XZ).merge(cells);
        assert_eq!(output.splats, vec![splat(1.5, 0.5)]);
        assert_eq!(output.report.culled(), 2);
    }

    #[test]
    fn test_cull_uses_plane() {
        let bounds = Bounds2::new(DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0));
        let s = Splat::at(Vec3::new(0.5, 0.5, 7.0));
        assert!(cull(vec![s], &bounds, GroundPlane::XZ).is_empty());
        assert_eq!(cull(vec![s], &bounds, GroundPlane::XY), vec![s]);
    }

    #[test]
    fn test_merge_culls_and_concatenates() {
        let mut cells = BTreeMap::new();
        // The left cell's training bled into the right cell.
        cells.insert(
            GridPos::new(0, 0),
            vec![splat(0.2, 0.2), splat(0.8, 0.8), splat(1.3, 0.5)],
        );
        cells.insert(GridPos::new(0, 1), vec![splat(1.3, 0.5), splat(1.9, 0.1)]);

        let output = AssetMerger::new(table(), GroundPlane::XZ).merge(cells);
        assert_eq!(output.splats.len(), 4);
        assert_eq!(output.splats[0], splat(0.2, 0.2));
        assert_eq!(output.splats[2], splat(1.3, 0.5));
        assert_eq!(
            output.report.cells[&GridPos::new(0, 0)],
            CellMergeStats {
                before: 3,
                after: 2
            }
        );
        assert_eq!(output.report.culled(), 1);
        assert_eq!(output.report.kept(), 4);
    }

    #[test]
    fn test_unknown_cell_skipped() {
        let mut cells = BTreeMap::new();
        cells.insert(GridPos::new(0, 0), vec![splat(0.5, 0.5)]);
        cells.insert(GridPos::new(5, 5), vec![splat(0.5, 0.5); 10]);

        let output = AssetMerger::new(table(), GroundPlane::XZ).merge(cells);
        assert_eq!(output.splats.len(), 1);
        assert_eq!(output.report.skipped, vec![GridPos::new(5, 5)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let cells: BTreeMap<_, _> = [
            (
                GridPos::new(0, 0),
                (0..50).map(|i| splat(i as f32 * 0.05, 0.5)).collect::<Vec<_>>(),
            ),
            (
                GridPos::new(0, 1),
                (0..50).map(|i| splat(i as f32 * 0.05, 0.25)).collect(),
            ),
        ]
        .into_iter()
        .collect();

        let merger = AssetMerger::new(table(), GroundPlane::XZ);
        let first = merger.merge(cells.clone());
        let second = merger.merge(cells);
        assert_eq!(first.splats, second.splats);
        assert_eq!(first.report, second.report);

        // Culled output fed back per cell is unchanged.
        let table = table();
        let per_cell: usize = table
            .iter()
            .map(|(_, bounds)| cull(first.splats.clone(), &bounds, GroundPlane::XZ).len())
            .sum();
        assert_eq!(per_cell, first.splats.len());
    }

    #[test]
    fn test_merge_dir() {
        let dir = tempfile::tempdir().unwrap();
        let left = [splat(0.5, 0.5), splat(1.5, 0.5)];
        cellsplat_data::save_splats(dir.path().join("0_0.ply"), &left).unwrap();
        cellsplat_data::save_splats(dir.path().join("0_1.ply"), &[splat(1.5, 0.5)]).unwrap();

        let output = AssetMerger::new(table(), GroundPlane::XZ)
            .merge_dir(dir.path(), "ply")
            .unwrap();
        assert_eq!(output.splats, vec![splat(0.5, 0.5), splat(1.5, 0.5)]);
    }
}

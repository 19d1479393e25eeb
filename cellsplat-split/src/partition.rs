//! Grid partitioning of a reconstruction scene.
//!
//! The partitioner lays a uniform grid over the ground-plane bounding box of
//! the driving entities (points or cameras), bins those entities into cells,
//! cross-references the other entity type through point tracks, prunes weakly
//! attested cameras and drops degenerate cells. Dropped cells keep their
//! boundaries in the grid so later stages can still reason about them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cellsplat_data::{
    Bounds2, Camera, CellTable, EmptyGridError, Grid, GridPos, NO_POINT3D, Point3D, Scene,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Driver, SplitConfig};

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("scene has no {0:?} with a usable position to bound")]
    EmptyScene(Driver),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] EmptyGridError),
}

/// Why a cell was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No camera survived pruning.
    NoCameras,
    /// Too many cameras for the amount of content.
    OverInstrumented,
    /// Below the minimum point count.
    TooFewPoints,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::NoCameras => "no cameras left after pruning",
            DropReason::OverInstrumented => "camera-to-point ratio too high",
            DropReason::TooFewPoints => "too few points",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedCell {
    pub pos: GridPos,
    pub reason: DropReason,
    pub points: usize,
    pub cameras: usize,
}

/// Counters accumulated during one partitioning run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionReport {
    /// Track entries naming a camera that is not in the scene.
    pub correlation_errors: usize,
    /// Driving entities that fell outside every cell.
    pub unassigned: usize,
    /// Cameras removed from cells for weak attestation.
    pub pruned_cameras: usize,
    /// Per cell, how many cell-point observations each camera contributed.
    pub frequencies: BTreeMap<GridPos, BTreeMap<u32, usize>>,
    pub dropped: Vec<DroppedCell>,
}

/// One surviving cell and its self-contained scene.
#[derive(Debug, Clone, PartialEq)]
pub struct CellScene {
    pub pos: GridPos,
    pub bounds: Bounds2,
    pub scene: Scene,
}

/// Result of partitioning: the full grid, the surviving cells in row-major
/// order and the run's counters.
#[derive(Debug, Clone)]
pub struct Partition {
    pub grid: Grid,
    pub cells: Vec<CellScene>,
    pub report: PartitionReport,
}

impl Partition {
    /// Boundaries of the surviving cells.
    pub fn cell_table(&self) -> CellTable {
        CellTable::from_cells(self.cells.iter().filter_map(|c| self.grid.cell(c.pos)))
    }

    pub fn cell(&self, pos: GridPos) -> Option<&CellScene> {
        self.cells.iter().find(|c| c.pos == pos)
    }
}

#[derive(Debug, Clone, Default)]
struct CellAccumulator {
    points: Vec<u64>,
    cameras: BTreeSet<u32>,
    frequencies: BTreeMap<u32, usize>,
}

/// Splits scenes into grid cells according to a [`SplitConfig`].
pub struct ScenePartitioner {
    config: SplitConfig,
}

impl ScenePartitioner {
    pub fn new(config: SplitConfig) -> Result<Self, PartitionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Partition a scene. The input is left untouched; every cell owns a copy
    /// of the records it keeps.
    #[tracing::instrument(skip_all, fields(rows = self.config.rows, cols = self.config.cols))]
    pub fn partition(&self, scene: &Scene) -> Result<Partition, PartitionError> {
        let mut report = PartitionReport::default();

        let (grid, accumulators) = match self.config.strategy.driver {
            Driver::Points => self.bin_by_points(scene, &mut report)?,
            Driver::Cameras => self.bin_by_cameras(scene, &mut report)?,
        };
        let cells = self.finish(scene, &grid, accumulators, &mut report);

        if report.correlation_errors > 0 {
            warn!(
                "{} track entries reference cameras missing from the scene",
                report.correlation_errors
            );
        }
        if report.unassigned > 0 {
            warn!(
                "{} {:?} fell outside every cell and were dropped",
                report.unassigned, self.config.strategy.driver
            );
        }
        info!(
            "Partitioned into {} cells ({} dropped, {} cameras pruned)",
            cells.len(),
            report.dropped.len(),
            report.pruned_cameras
        );

        Ok(Partition {
            grid,
            cells,
            report,
        })
    }

    fn grid_for(&self, bounds: Option<Bounds2>, driver: Driver) -> Result<Grid, PartitionError> {
        let bounds = bounds.ok_or(PartitionError::EmptyScene(driver))?;
        debug!(
            "Ground-plane bounds: [{}, {}] x [{}, {}]",
            bounds.min.x, bounds.max.x, bounds.min.y, bounds.max.y
        );
        Ok(Grid::new(bounds, self.config.rows, self.config.cols)?)
    }

    /// Points drive binning; each point pulls the cameras of its track into
    /// its cell.
    fn bin_by_points(
        &self,
        scene: &Scene,
        report: &mut PartitionReport,
    ) -> Result<(Grid, Vec<CellAccumulator>), PartitionError> {
        let plane = self.config.plane;
        let strategy = self.config.strategy;
        let project = |p: &Point3D| plane.project(strategy.point_position(p));

        let grid = self.grid_for(
            Bounds2::enclosing(scene.points.values().map(project)),
            Driver::Points,
        )?;
        let mut acc = vec![CellAccumulator::default(); grid.len()];

        for (id, point) in &scene.points {
            let Some(idx) = grid.locate(project(point)) else {
                debug!("Point {} lies outside the grid", id);
                report.unassigned += 1;
                continue;
            };
            let cell = &mut acc[idx];
            cell.points.push(*id);
            for el in &point.track {
                if !scene.cameras.contains_key(&el.camera_id) {
                    report.correlation_errors += 1;
                    continue;
                }
                cell.cameras.insert(el.camera_id);
                *cell.frequencies.entry(el.camera_id).or_default() += 1;
            }
        }

        Ok((grid, acc))
    }

    /// Cameras drive binning; each point joins every cell holding a camera
    /// that observed it.
    fn bin_by_cameras(
        &self,
        scene: &Scene,
        report: &mut PartitionReport,
    ) -> Result<(Grid, Vec<CellAccumulator>), PartitionError> {
        let plane = self.config.plane;
        let strategy = self.config.strategy;
        let project = |c: &Camera| plane.project(strategy.camera_position(c));

        let grid = self.grid_for(
            Bounds2::enclosing(scene.cameras.values().map(project)),
            Driver::Cameras,
        )?;
        let mut acc = vec![CellAccumulator::default(); grid.len()];

        let mut camera_cell = BTreeMap::new();
        for (id, camera) in &scene.cameras {
            match grid.locate(project(camera)) {
                Some(idx) => {
                    acc[idx].cameras.insert(*id);
                    camera_cell.insert(*id, idx);
                }
                None => {
                    debug!("Camera {} lies outside the grid", id);
                    report.unassigned += 1;
                }
            }
        }

        let mut touched = BTreeSet::new();
        for (id, point) in &scene.points {
            touched.clear();
            for el in &point.track {
                if !scene.cameras.contains_key(&el.camera_id) {
                    report.correlation_errors += 1;
                    continue;
                }
                if let Some(&idx) = camera_cell.get(&el.camera_id) {
                    *acc[idx].frequencies.entry(el.camera_id).or_default() += 1;
                    touched.insert(idx);
                }
            }
            for &idx in &touched {
                acc[idx].points.push(*id);
            }
        }

        Ok((grid, acc))
    }

    /// Prune cameras, drop degenerate cells and build the surviving scenes.
    fn finish(
        &self,
        scene: &Scene,
        grid: &Grid,
        accumulators: Vec<CellAccumulator>,
        report: &mut PartitionReport,
    ) -> Vec<CellScene> {
        let t = self.config.thresholds;
        let mut cells = Vec::new();

        for (cell, acc) in grid.cells().iter().zip(accumulators) {
            let point_count = acc.points.len();

            let kept: Vec<u32> = acc
                .cameras
                .iter()
                .copied()
                .filter(|cam| {
                    let freq = acc.frequencies.get(cam).copied().unwrap_or(0);
                    let keep = point_count > 0
                        && freq as f64 / point_count as f64 >= t.min_camera_frequency;
                    if !keep {
                        debug!(
                            "Cell {}: pruning camera {} ({} of {} points)",
                            cell.pos, cam, freq, point_count
                        );
                    }
                    keep
                })
                .collect();
            report.pruned_cameras += acc.cameras.len() - kept.len();

            let reason = if kept.is_empty() {
                Some(DropReason::NoCameras)
            } else if kept.len() as f64 / point_count as f64 > t.max_camera_point_ratio {
                Some(DropReason::OverInstrumented)
            } else if point_count < t.min_points {
                Some(DropReason::TooFewPoints)
            } else {
                None
            };

            report.frequencies.insert(cell.pos, acc.frequencies);

            if let Some(reason) = reason {
                warn!(
                    "Dropping cell {}: {} ({} points, {} cameras)",
                    cell.pos,
                    reason,
                    point_count,
                    kept.len()
                );
                report.dropped.push(DroppedCell {
                    pos: cell.pos,
                    reason,
                    points: point_count,
                    cameras: kept.len(),
                });
                continue;
            }

            let cell_scene = self.cell_scene(scene, &acc.points, &kept);
            info!(
                "Cell {}: {} points, {} cameras",
                cell.pos,
                cell_scene.points.len(),
                cell_scene.cameras.len()
            );
            cells.push(CellScene {
                pos: cell.pos,
                bounds: cell.bounds,
                scene: cell_scene,
            });
        }

        cells
    }

    fn cell_scene(&self, scene: &Scene, point_ids: &[u64], camera_ids: &[u32]) -> Scene {
        let points = point_ids
            .iter()
            .filter_map(|id| scene.points.get(id).map(|p| (*id, p.clone())))
            .collect();
        let cameras = camera_ids
            .iter()
            .filter_map(|id| scene.cameras.get(id).map(|c| (*id, c.clone())))
            .collect();

        let mut cell = Scene::new(points, cameras);
        if self.config.trim_references {
            trim_references(&mut cell);
        }
        cell
    }
}

/// Drop track entries naming cameras outside the scene and unlink camera
/// observations of points outside the scene.
pub fn trim_references(scene: &mut Scene) {
    let Scene { points, cameras } = scene;
    for point in points.values_mut() {
        point.track.retain(|el| cameras.contains_key(&el.camera_id));
    }
    for camera in cameras.values_mut() {
        for obs in &mut camera.observations {
            if obs.point3d().is_some_and(|id| !points.contains_key(&id)) {
                obs.point3d_id = NO_POINT3D;
            }
        }
    }
}

/// Partition `scene` with `config`.
pub fn partition(scene: &Scene, config: &SplitConfig) -> Result<Partition, PartitionError> {
    ScenePartitioner::new(config.clone())?.partition(scene)
}

//! Ground-plane grid model.
//!
//! A scene is partitioned on two of its three axes (the ground plane); the
//! remaining vertical axis is ignored. Row 0 is the top row, i.e. the cells
//! with the largest values on the second ground axis, and column indices grow
//! along the first ground axis.

use std::fmt;
use std::str::FromStr;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The pair of world axes used for partitioning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundPlane {
    XY,
    #[default]
    XZ,
    YZ,
}

impl GroundPlane {
    /// Drop the vertical axis.
    pub fn project(self, p: DVec3) -> DVec2 {
        match self {
            GroundPlane::XY => DVec2::new(p.x, p.y),
            GroundPlane::XZ => DVec2::new(p.x, p.z),
            GroundPlane::YZ => DVec2::new(p.y, p.z),
        }
    }
}

impl FromStr for GroundPlane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xy" => Ok(GroundPlane::XY),
            "xz" => Ok(GroundPlane::XZ),
            "yz" => Ok(GroundPlane::YZ),
            other => Err(format!("unknown ground plane '{other}' (expected xy, xz or yz)")),
        }
    }
}

/// Position of a cell in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPos {
    pub row: u32,
    pub col: u32,
}

impl GridPos {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Formats as `row_col`, the form used in directory and asset names.
impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid grid position '{0}' (expected <row>_<col>)")]
pub struct ParseGridPosError(String);

impl FromStr for GridPos {
    type Err = ParseGridPosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGridPosError(s.to_string());
        let (row, col) = s.split_once('_').ok_or_else(err)?;
        Ok(Self {
            row: row.parse().map_err(|_| err())?,
            col: col.parse().map_err(|_| err())?,
        })
    }
}

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds2 {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Smallest rectangle enclosing all positions, or `None` for no positions.
    /// NaN coordinates are ignored.
    pub fn enclosing(positions: impl IntoIterator<Item = DVec2>) -> Option<Self> {
        positions
            .into_iter()
            .filter(|p| !p.is_nan())
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    Some(b) => Self::new(b.min.min(p), b.max.max(p)),
                    None => Self::new(p, p),
                })
            })
    }

    /// `min <= p < max` on both axes.
    pub fn contains(&self, p: DVec2) -> bool {
        self.min.x <= p.x && p.x < self.max.x && self.min.y <= p.y && p.y < self.max.y
    }

    /// Like [`Bounds2::contains`], but the max edge of each axis flagged in
    /// `closed` is inclusive.
    pub fn contains_closed(&self, p: DVec2, closed: [bool; 2]) -> bool {
        let within = |lo: f64, v: f64, hi: f64, closed: bool| {
            lo <= v && (v < hi || (closed && v == hi))
        };
        within(self.min.x, p.x, self.max.x, closed[0])
            && within(self.min.y, p.y, self.max.y, closed[1])
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn area(&self) -> f64 {
        let size = self.size();
        size.x * size.y
    }
}

/// One rectangle of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub pos: GridPos,
    pub bounds: Bounds2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("grid must have at least one row and one column (got {rows}x{cols})")]
pub struct EmptyGridError {
    pub rows: u32,
    pub cols: u32,
}

/// A uniform `rows x cols` tiling of a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: u32,
    cols: u32,
    bounds: Bounds2,
    /// Row-major.
    cells: Vec<Cell>,
}

impl Grid {
    /// Tile `bounds` into `rows x cols` equal cells.
    ///
    /// Neighbouring cells share the exact same edge value and the outer edges
    /// are the bounding box values themselves, so the tiling has no gaps.
    pub fn new(bounds: Bounds2, rows: u32, cols: u32) -> Result<Self, EmptyGridError> {
        if rows == 0 || cols == 0 {
            return Err(EmptyGridError { rows, cols });
        }

        let col_size = (bounds.max.x - bounds.min.x) / cols as f64;
        let row_size = (bounds.max.y - bounds.min.y) / rows as f64;

        let col_edge = |c: u32| {
            if c == cols {
                bounds.max.x
            } else {
                bounds.min.x + col_size * c as f64
            }
        };
        // Rows run top to bottom.
        let row_edge = |r: u32| {
            if r == rows {
                bounds.min.y
            } else {
                bounds.max.y - row_size * r as f64
            }
        };

        let mut cells = Vec::with_capacity(rows as usize * cols as usize);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    pos: GridPos::new(row, col),
                    bounds: Bounds2::new(
                        DVec2::new(col_edge(col), row_edge(row + 1)),
                        DVec2::new(col_edge(col + 1), row_edge(row)),
                    ),
                });
            }
        }

        Ok(Self {
            rows,
            cols,
            bounds,
            cells,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major index of a position, if it lies in the grid.
    pub fn index_of(&self, pos: GridPos) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols)
            .then(|| pos.row as usize * self.cols as usize + pos.col as usize)
    }

    pub fn cell(&self, pos: GridPos) -> Option<&Cell> {
        self.index_of(pos).map(|i| &self.cells[i])
    }

    /// Find the cell containing `p`, scanning rows then columns and taking the
    /// first match. Cells are half-open except on the outer max edges of the
    /// grid (last column, top row), which are closed.
    pub fn locate(&self, p: DVec2) -> Option<usize> {
        self.cells.iter().position(|cell| {
            let closed = [cell.pos.col == self.cols - 1, cell.pos.row == 0];
            cell.bounds.contains_closed(p, closed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(rows: u32, cols: u32) -> Grid {
        Grid::new(
            Bounds2::new(DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0)),
            rows,
            cols,
        )
        .unwrap()
    }

    #[test]
    fn test_ground_plane_projection() {
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(GroundPlane::XY.project(p), DVec2::new(1.0, 2.0));
        assert_eq!(GroundPlane::XZ.project(p), DVec2::new(1.0, 3.0));
        assert_eq!(GroundPlane::YZ.project(p), DVec2::new(2.0, 3.0));
        assert_eq!("XZ".parse::<GroundPlane>(), Ok(GroundPlane::XZ));
        assert!("xw".parse::<GroundPlane>().is_err());
    }

    #[test]
    fn test_grid_pos_text_form() {
        let pos: GridPos = "3_12".parse().unwrap();
        assert_eq!(pos, GridPos::new(3, 12));
        assert_eq!(pos.to_string(), "3_12");
        assert!("3-12".parse::<GridPos>().is_err());
        assert!("a_1".parse::<GridPos>().is_err());
        assert!("1_".parse::<GridPos>().is_err());
    }

    #[test]
    fn test_enclosing_bounds() {
        let b = Bounds2::enclosing([
            DVec2::new(1.0, -1.0),
            DVec2::new(-2.0, 4.0),
            DVec2::new(f64::NAN, 100.0),
        ])
        .unwrap();
        assert_eq!(b.min, DVec2::new(-2.0, -1.0));
        assert_eq!(b.max, DVec2::new(1.0, 4.0));
        assert!(Bounds2::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let b = Bounds2::new(DVec2::ZERO, DVec2::ONE);
        assert_eq!(Grid::new(b, 0, 2), Err(EmptyGridError { rows: 0, cols: 2 }));
    }

    #[test]
    fn test_row_zero_is_top() {
        let grid = unit_grid(2, 2);
        let top_left = grid.cell(GridPos::new(0, 0)).unwrap();
        assert_eq!(top_left.bounds.min, DVec2::new(0.0, 0.5));
        assert_eq!(top_left.bounds.max, DVec2::new(0.5, 1.0));
        let bottom_right = grid.cell(GridPos::new(1, 1)).unwrap();
        assert_eq!(bottom_right.bounds.min, DVec2::new(0.5, 0.0));
        assert_eq!(bottom_right.bounds.max, DVec2::new(1.0, 0.5));
    }

    #[test]
    fn test_cells_tile_bounds_exactly() {
        let bounds = Bounds2::new(DVec2::new(-3.7, 0.1), DVec2::new(11.3, 9.9));
        let grid = Grid::new(bounds, 3, 7).unwrap();

        let area: f64 = grid.cells().iter().map(|c| c.bounds.area()).sum();
        assert!((area - bounds.area()).abs() < 1e-9);

        for cell in grid.cells() {
            let GridPos { row, col } = cell.pos;
            if col + 1 < grid.cols() {
                let right = grid.cell(GridPos::new(row, col + 1)).unwrap();
                assert_eq!(cell.bounds.max.x, right.bounds.min.x);
            } else {
                assert_eq!(cell.bounds.max.x, bounds.max.x);
            }
            if row + 1 < grid.rows() {
                let below = grid.cell(GridPos::new(row + 1, col)).unwrap();
                assert_eq!(cell.bounds.min.y, below.bounds.max.y);
            } else {
                assert_eq!(cell.bounds.min.y, bounds.min.y);
            }
            if col == 0 {
                assert_eq!(cell.bounds.min.x, bounds.min.x);
            }
            if row == 0 {
                assert_eq!(cell.bounds.max.y, bounds.max.y);
            }
        }
    }

    #[test]
    fn test_locate_half_open_and_outer_edges() {
        let grid = unit_grid(2, 2);
        let pos = |p: DVec2| grid.locate(p).map(|i| grid.cells()[i].pos);

        assert_eq!(pos(DVec2::new(0.25, 0.75)), Some(GridPos::new(0, 0)));
        // Shared edges belong to the cell whose min they are.
        assert_eq!(pos(DVec2::new(0.5, 0.75)), Some(GridPos::new(0, 1)));
        assert_eq!(pos(DVec2::new(0.25, 0.5)), Some(GridPos::new(0, 0)));
        // Outer max edges and the far corner are still inside.
        assert_eq!(pos(DVec2::new(1.0, 0.25)), Some(GridPos::new(1, 1)));
        assert_eq!(pos(DVec2::new(0.25, 1.0)), Some(GridPos::new(0, 0)));
        assert_eq!(pos(DVec2::new(1.0, 1.0)), Some(GridPos::new(0, 1)));
        assert_eq!(pos(DVec2::new(0.0, 0.0)), Some(GridPos::new(1, 0)));

        assert_eq!(pos(DVec2::new(1.5, 0.5)), None);
        assert_eq!(pos(DVec2::new(f64::NAN, 0.5)), None);
    }

    #[test]
    fn test_degenerate_bounds_still_locate() {
        let grid = Grid::new(Bounds2::new(DVec2::splat(2.0), DVec2::splat(2.0)), 2, 2).unwrap();
        assert!(grid.locate(DVec2::splat(2.0)).is_some());
    }
}

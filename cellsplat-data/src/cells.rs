//! Cell-boundary table: the hand-off between splitting and merging.
//!
//! Plain text, three lines per cell:
//!
//! ```text
//! <row> <col>
//! <min_x> <min_z>
//! <max_x> <max_z>
//! ```
//!
//! Floats are written in shortest round-trip form so a reloaded table is
//! bit-identical to the one that was saved.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::DVec2;
use thiserror::Error;
use tracing::debug;

use crate::grid::{Bounds2, Cell, GridPos};

pub const CELL_TABLE_FILE: &str = "cell_boundaries.txt";

#[derive(Debug, Error)]
pub enum CellTableError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<CellTableError>,
    },
    #[error("IO error: {0}")]
    Stream(#[from] io::Error),
}

impl CellTableError {
    /// Attach the file the error came from.
    fn in_file(self, path: &Path) -> Self {
        match self {
            CellTableError::Io { .. } | CellTableError::File { .. } => self,
            other => CellTableError::File {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }
}

/// Boundaries of the cells that were exported, keyed by grid position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTable {
    cells: BTreeMap<GridPos, Bounds2>,
}

impl CellTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        Self {
            cells: cells.into_iter().map(|c| (c.pos, c.bounds)).collect(),
        }
    }

    pub fn insert(&mut self, pos: GridPos, bounds: Bounds2) -> Option<Bounds2> {
        self.cells.insert(pos, bounds)
    }

    pub fn get(&self, pos: GridPos) -> Option<&Bounds2> {
        self.cells.get(&pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPos, Bounds2)> + '_ {
        self.cells.iter().map(|(pos, b)| (*pos, *b))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (pos, b) in &self.cells {
            writeln!(writer, "{} {}", pos.row, pos.col)?;
            writeln!(writer, "{} {}", b.min.x, b.min.y)?;
            writeln!(writer, "{} {}", b.max.x, b.max.y)?;
        }
        Ok(())
    }

    /// Parse a table. Blank lines between records are ignored.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, CellTableError> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|l| (i + 1, l)))
            .filter(|line| !matches!(line, Ok((_, l)) if l.trim().is_empty()));

        let mut table = Self::new();
        while let Some(first) = lines.next() {
            let (line, text) = first?;
            let [row, col] = parse_pair::<u32>(line, &text)?;

            let mut next_pair = |what: &str| -> Result<[f64; 2], CellTableError> {
                match lines.next() {
                    Some(res) => {
                        let (line, text) = res?;
                        parse_pair::<f64>(line, &text)
                    }
                    None => Err(CellTableError::Parse {
                        line,
                        message: format!("missing {what} line for cell {row}_{col}"),
                    }),
                }
            };
            let [min_x, min_y] = next_pair("min")?;
            let [max_x, max_y] = next_pair("max")?;

            let pos = GridPos::new(row, col);
            let bounds = Bounds2::new(DVec2::new(min_x, min_y), DVec2::new(max_x, max_y));
            if table.insert(pos, bounds).is_some() {
                return Err(CellTableError::Parse {
                    line,
                    message: format!("cell {pos} listed twice"),
                });
            }
        }

        Ok(table)
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CellTableError> {
        let path = path.as_ref();
        let io_err = |source| CellTableError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(io_err)?;
        debug!("Wrote {} cell boundaries", self.len());
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CellTableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CellTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::read_from(BufReader::new(file)).map_err(|e| e.in_file(path))?;
        debug!("Loaded {} cell boundaries", table.len());
        Ok(table)
    }
}

fn parse_pair<T: std::str::FromStr>(line: usize, text: &str) -> Result<[T; 2], CellTableError> {
    let err = || CellTableError::Parse {
        line,
        message: format!("expected two numbers, found '{}'", text.trim()),
    };
    let mut words = text.split_whitespace();
    let a = words.next().and_then(|w| w.parse().ok()).ok_or_else(err)?;
    let b = words.next().and_then(|w| w.parse().ok()).ok_or_else(err)?;
    if words.next().is_some() {
        return Err(err());
    }
    Ok([a, b])
}

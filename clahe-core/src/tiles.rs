/// Tile partitioning.
///
/// Each axis is cut into `n` spans of `ceil(len / n)` samples. The trailing span
/// absorbs the remainder and may be shorter, or even empty when `n` does not fit
/// the length (e.g. 9 samples into 6 tiles gives spans of 2,2,2,2,1,0).
use std::ops::Range;

use crate::error::{Error, Result};
use crate::params::GridSize;

/// Partition of one axis into tile spans.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisPartition {
    len: usize,
    count: usize,
    step: usize,
}

impl AxisPartition {
    pub fn new(len: usize, count: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::invalid("cannot partition an empty axis"));
        }
        if count == 0 {
            return Err(Error::invalid("tile count must be at least 1"));
        }
        Ok(Self {
            len,
            count,
            step: len.div_ceil(count),
        })
    }

    /// Length of the axis in samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of tiles, including empty trailing ones.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Nominal tile length.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn span(&self, index: usize) -> Range<usize> {
        let start = (index * self.step).min(self.len);
        let end = (start + self.step).min(self.len);
        start..end
    }

    /// Number of leading tiles that contain at least one sample.
    pub fn non_empty(&self) -> usize {
        self.len.div_ceil(self.step)
    }

    /// Geometric center of a non-empty tile in continuous coordinates, where
    /// sample `i` covers `[i, i + 1)`.
    pub fn center(&self, index: usize) -> f64 {
        let span = self.span(index);
        (span.start + span.end) as f64 / 2.0
    }
}

/// A rectangular view `[x0, x1) x [y0, y1)` into a plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub tx: usize,
    pub ty: usize,
    pub xs: Range<usize>,
    pub ys: Range<usize>,
}

impl Tile {
    pub fn pixel_count(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }
}

/// Grid of tiles covering a `width x height` plane exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub cols: AxisPartition,
    pub rows: AxisPartition,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, grid: GridSize) -> Result<Self> {
        grid.validate()?;
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "plane must be non-empty, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            cols: AxisPartition::new(width as usize, grid.x as usize)?,
            rows: AxisPartition::new(height as usize, grid.y as usize)?,
        })
    }

    pub fn tiles_x(&self) -> usize {
        self.cols.count()
    }

    pub fn tiles_y(&self) -> usize {
        self.rows.count()
    }

    pub fn len(&self) -> usize {
        self.tiles_x() * self.tiles_y()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tile(&self, tx: usize, ty: usize) -> Tile {
        Tile {
            tx,
            ty,
            xs: self.cols.span(tx),
            ys: self.rows.span(ty),
        }
    }

    /// Tile at row-major `index`.
    pub fn tile_at(&self, index: usize) -> Tile {
        self.tile(index % self.tiles_x(), index / self.tiles_x())
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.len()).map(|i| self.tile_at(i))
    }
}

/// Per-tile lookup tables.
///
/// Every tile gets a `levels`-entry LUT built from the cumulative distribution of
/// its clipped histogram. All LUTs live in one `(tiles_y, tiles_x, levels)` arena
/// allocated once per invocation.
use ndarray::{Array3, ArrayView1, ArrayView2, Axis};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::histogram::{clip_histogram, clip_limit, tile_histogram, ClipOutcome};
use crate::params::ClaheParams;
use crate::plane::{Plane, Sample};
use crate::tiles::TileGrid;

/// Fill `lut` with `round(cdf[i] * (levels - 1) / tile_pixels)`.
///
/// An empty tile gets the identity mapping.
pub fn build_mapping<T: Sample>(hist: &[u32], tile_pixels: usize, lut: &mut [T]) {
    debug_assert_eq!(hist.len(), lut.len());

    if tile_pixels == 0 {
        for (i, out) in lut.iter_mut().enumerate() {
            *out = T::from_level(i);
        }
        return;
    }

    let max = (lut.len() - 1) as u64;
    let total = tile_pixels as u64;
    let mut cdf = 0u64;
    for (out, &count) in lut.iter_mut().zip(hist) {
        cdf += count as u64;
        // Round half up without going through floats.
        let val = (2 * cdf * max + total) / (2 * total);
        *out = T::from_level(val.min(max) as usize);
    }
}

/// Summary of contrast limiting over all tiles of one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipStats {
    pub clipped: u64,
    pub saturated: u64,
    pub saturated_tiles: usize,
    pub empty_tiles: usize,
}

/// The LUT arena for one plane.
#[derive(Debug, Clone)]
pub struct TileLuts<T: Sample> {
    grid: TileGrid,
    table: Array3<T>,
    stats: ClipStats,
}

impl<T: Sample> TileLuts<T> {
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn levels(&self) -> usize {
        self.table.len_of(Axis(2))
    }

    pub fn stats(&self) -> ClipStats {
        self.stats
    }

    /// LUT of tile `(tx, ty)`.
    pub fn lut(&self, tx: usize, ty: usize) -> ArrayView1<'_, T> {
        self.table.index_axis(Axis(0), ty).index_axis_move(Axis(0), tx)
    }

    /// LUTs of one tile row, indexed `[[tx, level]]`.
    pub fn tile_row(&self, ty: usize) -> ArrayView2<'_, T> {
        self.table.index_axis(Axis(0), ty)
    }
}

/// Compute the LUT of every tile of `plane`.
///
/// Tiles are independent; with the `parallel` feature they are processed on the
/// rayon pool, each worker writing its own slot of the arena.
pub fn build_tile_luts<T: Sample>(plane: &Plane<T>, params: &ClaheParams) -> Result<TileLuts<T>> {
    params.validate()?;
    let grid = TileGrid::new(plane.width(), plane.height(), params.grid)?;
    let levels = plane.levels();

    let mut data = vec![T::default(); grid.len() * levels];

    #[cfg(feature = "parallel")]
    let slots = data.par_chunks_mut(levels);
    #[cfg(not(feature = "parallel"))]
    let slots = data.chunks_mut(levels);

    let outcomes: Vec<(usize, ClipOutcome)> = slots
        .enumerate()
        .map(|(index, lut)| {
            let tile = grid.tile_at(index);
            let pixels = tile.pixel_count();
            let mut hist = tile_histogram(plane, &tile);
            let outcome = match clip_limit(params.clip_limit, pixels, levels) {
                Some(limit) if pixels > 0 => clip_histogram(&mut hist, limit),
                _ => ClipOutcome::default(),
            };
            build_mapping(&hist, pixels, lut);
            (pixels, outcome)
        })
        .collect();

    let mut stats = ClipStats::default();
    for (pixels, outcome) in &outcomes {
        stats.clipped += outcome.clipped;
        stats.saturated += outcome.saturated;
        stats.saturated_tiles += usize::from(outcome.saturated > 0);
        stats.empty_tiles += usize::from(*pixels == 0);
    }
    if stats.saturated > 0 {
        log::debug!(
            "clip limit saturated in {} of {} tiles ({} counts above limit)",
            stats.saturated_tiles,
            grid.len(),
            stats.saturated
        );
    }
    if stats.empty_tiles > 0 {
        log::debug!(
            "{} empty tiles in a {}x{} grid over {}x{}, using identity mapping",
            stats.empty_tiles,
            grid.tiles_x(),
            grid.tiles_y(),
            plane.width(),
            plane.height()
        );
    }

    let table = Array3::from_shape_vec((grid.tiles_y(), grid.tiles_x(), levels), data)
        .map_err(|e| Error::invalid(format!("LUT arena shape: {}", e)))?;

    Ok(TileLuts { grid, table, stats })
}

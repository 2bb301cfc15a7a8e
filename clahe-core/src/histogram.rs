/// Per-tile histograms and contrast limiting.
use crate::plane::{Plane, Sample};
use crate::tiles::Tile;

/// Passes of overflow redistribution before the remaining excess is spread
/// uniformly regardless of the limit.
pub const MAX_REDISTRIBUTION_PASSES: usize = 64;

/// Count the samples of `tile` into a histogram of `plane.levels()` bins.
pub fn tile_histogram<T: Sample>(plane: &Plane<T>, tile: &Tile) -> Vec<u32> {
    let mut hist = vec![0u32; plane.levels()];
    for y in tile.ys.clone() {
        let row = plane.row(y as u32);
        for &s in &row[tile.xs.clone()] {
            hist[s.to_level()] += 1;
        }
    }
    hist
}

/// Per-bin cap for a tile of `tile_pixels` samples, or `None` when clipping is off.
///
/// The limit is `clip_factor * tile_pixels / levels`, truncated, and never below 1.
pub fn clip_limit(clip_factor: f64, tile_pixels: usize, levels: usize) -> Option<u32> {
    if !(clip_factor > 0.0 && clip_factor.is_finite()) || levels == 0 {
        return None;
    }
    let limit = (clip_factor * tile_pixels as f64 / levels as f64).floor();
    Some(limit.clamp(1.0, u32::MAX as f64) as u32)
}

/// What happened while clipping one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipOutcome {
    /// Total count removed from over-limit bins.
    pub clipped: u64,
    /// Count that could not be placed under the limit and was spread anyway.
    pub saturated: u64,
    pub passes: usize,
}

/// Clip bins at `limit` and redistribute the excess so the total is unchanged.
///
/// Excess is shared among the bins still below the limit: an even share each,
/// then the remainder one unit at a time at a stride of `levels / remainder`
/// across the whole range, so leftovers never pile up at one end. Anything that
/// finds no room is pooled and shared again. Once no bin can take more, or after
/// [`MAX_REDISTRIBUTION_PASSES`], the leftover is spread over all bins the same
/// way and some bins end up above the limit.
pub fn clip_histogram(hist: &mut [u32], limit: u32) -> ClipOutcome {
    let mut outcome = ClipOutcome::default();

    let mut excess = 0u64;
    for h in hist.iter_mut() {
        if *h > limit {
            excess += (*h - limit) as u64;
            *h = limit;
        }
    }
    outcome.clipped = excess;

    while excess > 0 && outcome.passes < MAX_REDISTRIBUTION_PASSES {
        let eligible = hist.iter().filter(|&&h| h < limit).count() as u64;
        if eligible == 0 {
            break;
        }
        outcome.passes += 1;

        let share = excess / eligible;
        let mut overflow = 0u64;
        if share > 0 {
            for h in hist.iter_mut().filter(|h| **h < limit) {
                let taken = share.min((limit - *h) as u64);
                *h += taken as u32;
                overflow += share - taken;
            }
        }
        overflow += place_strided(hist, excess % eligible, limit);

        excess = overflow;
    }

    if excess > 0 {
        outcome.saturated = excess;
        spread_evenly(hist, excess);
    }

    outcome
}

/// Add `amount` single units at positions `k * len / amount`, a stride of
/// `len / amount` kept exact so the units cover the whole range. A position
/// whose bin is already at `limit` moves forward to the next bin with room.
/// Returns the units that found none.
fn place_strided(hist: &mut [u32], amount: u64, limit: u32) -> u64 {
    let len = hist.len() as u64;
    let mut cursor = 0usize;
    for k in 0..amount {
        cursor = cursor.max((k * len / amount) as usize);
        while cursor < hist.len() && hist[cursor] >= limit {
            cursor += 1;
        }
        if cursor == hist.len() {
            return amount - k;
        }
        hist[cursor] += 1;
        cursor += 1;
    }
    0
}

fn spread_evenly(hist: &mut [u32], amount: u64) {
    let bins = hist.len() as u64;
    let share = (amount / bins) as u32;
    for h in hist.iter_mut() {
        *h += share;
    }
    let unplaced = place_strided(hist, amount % bins, u32::MAX);
    debug_assert_eq!(unplaced, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GridSize;
    use crate::tiles::TileGrid;

    fn total(hist: &[u32]) -> u64 {
        hist.iter().map(|&h| h as u64).sum()
    }

    #[test]
    fn test_tile_histogram_counts_only_tile_pixels() {
        #[rustfmt::skip]
        let plane = Plane::<u8>::new(4, 2, vec![
            1, 1, 2, 2,
            1, 3, 2, 2,
        ]).unwrap();
        let grid = TileGrid::new(4, 2, GridSize::new(2, 1)).unwrap();

        let left = tile_histogram(&plane, &grid.tile(0, 0));
        assert_eq!(left.len(), 256);
        assert_eq!((left[1], left[3], left[2]), (3, 1, 0));

        let right = tile_histogram(&plane, &grid.tile(1, 0));
        assert_eq!(right[2], 4);
        assert_eq!(total(&right), 4);
    }

    #[test]
    fn test_clip_limit() {
        assert_eq!(clip_limit(2.0, 4096, 256), Some(32));
        assert_eq!(clip_limit(2.5, 100, 256), Some(1));
        assert_eq!(clip_limit(0.0, 4096, 256), None);
        assert_eq!(clip_limit(-3.0, 4096, 256), None);
        assert_eq!(clip_limit(f64::INFINITY, 4096, 256), None);
    }

    #[test]
    fn test_clip_histogram_basic() {
        let mut hist = [0u32; 256];
        hist[0] = 1000;
        hist[1] = 500;
        let outcome = clip_histogram(&mut hist, 100);
        assert!(hist.iter().all(|&v| v <= 100));
        assert_eq!(total(&hist), 1500);
        assert_eq!(outcome.clipped, 1300);
        assert_eq!(outcome.saturated, 0);
    }

    #[test]
    fn test_clip_above_max_is_noop() {
        let mut hist = vec![0u32; 16];
        hist[3] = 7;
        hist[9] = 5;
        let before = hist.clone();
        let outcome = clip_histogram(&mut hist, 7);
        assert_eq!(hist, before);
        assert_eq!(outcome, ClipOutcome::default());
    }

    #[test]
    fn test_remainder_is_strided_across_range() {
        let mut hist = vec![0u32; 16];
        hist[0] = 5;
        clip_histogram(&mut hist, 1);
        // 4 units at stride 4; position 0 is full so that unit moves to bin 1.
        let expected: Vec<u32> = (0..16)
            .map(|i| u32::from(matches!(i, 0 | 1 | 4 | 8 | 12)))
            .collect();
        assert_eq!(hist, expected);
    }

    #[test]
    fn test_limit_of_one_does_not_favour_dark_bins() {
        // A 16-bit tile: a handful of occupied bins and a limit of 1.
        let mut hist = vec![0u32; 65536];
        for v in [10_000usize, 20_000, 30_000, 40_000] {
            hist[v] = 256;
        }
        let outcome = clip_histogram(&mut hist, 1);
        assert_eq!(outcome.clipped, 1020);
        assert_eq!(outcome.saturated, 0);
        assert!(hist.iter().all(|&h| h <= 1));

        // Every quarter of the range gets its proportional share.
        for quarter in hist.chunks(16384) {
            let placed: u64 = quarter.iter().map(|&h| h as u64).sum();
            assert!((250..=262).contains(&placed), "quarter got {}", placed);
        }
    }

    #[test]
    fn test_overflow_is_redistributed_again() {
        let mut hist = vec![0u32; 4];
        hist[0] = 10;
        hist[1] = 3;
        // limit 4: excess 6 over bins 1,2,3 -> 2 each, bin 1 overflows by 1,
        // which the second pass moves forward from bin 0 to bin 2.
        let outcome = clip_histogram(&mut hist, 4);
        assert_eq!(hist, vec![4, 4, 3, 2]);
        assert_eq!(outcome.passes, 2);
        assert_eq!(total(&hist), 13);
    }

    #[test]
    fn test_saturation_conserves_total() {
        // 4 bins * limit 2 = 8 < 20: the cap cannot hold.
        let mut hist = vec![20u32, 0, 0, 0];
        let outcome = clip_histogram(&mut hist, 2);
        assert_eq!(total(&hist), 20);
        assert_eq!(outcome.saturated, 12);
        assert_eq!(hist, vec![5, 5, 5, 5]);
    }

    #[test]
    fn test_saturated_remainder_is_strided() {
        // Share 1 fills bins 1..=7, so the 4 remainder units saturate and are
        // spread at stride 2 over all 8 bins.
        let mut hist = vec![12u32, 0, 0, 0, 0, 0, 0, 0];
        let outcome = clip_histogram(&mut hist, 1);
        assert_eq!(outcome.saturated, 4);
        assert_eq!(outcome.passes, 1);
        assert_eq!(hist, vec![2, 1, 2, 1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_conservation_on_skewed_histograms() {
        for limit in [1u32, 3, 17, 64, 300] {
            let mut hist: Vec<u32> = (0..256u32).map(|i| (i * 37 + 11) % 97 * (i % 5)).collect();
            let before = total(&hist);
            let outcome = clip_histogram(&mut hist, limit);
            assert_eq!(total(&hist), before, "limit {}", limit);
            if outcome.saturated == 0 {
                assert!(hist.iter().all(|&h| h <= limit));
            }
        }
    }
}

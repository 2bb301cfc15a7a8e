/// Bilinear blending of tile LUTs.
///
/// A sample at `(x, y)` sits at `(x + 0.5, y + 0.5)`. On each axis it is bracketed
/// by the two nearest tile centers; before the first center or past the last one
/// it clamps to the edge tile. Only non-empty tiles take part, so an empty trailing
/// tile never receives weight.
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::mapping::TileLuts;
use crate::plane::{Plane, Sample};
use crate::tiles::AxisPartition;

/// Tiles bracketing one coordinate and the weight of the upper one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lo: usize,
    pub hi: usize,
    pub weight: f64,
}

impl Bracket {
    fn clamped(tile: usize) -> Self {
        Self {
            lo: tile,
            hi: tile,
            weight: 0.0,
        }
    }
}

/// Bracket of every sample position along `axis`.
pub fn axis_brackets(axis: &AxisPartition) -> Vec<Bracket> {
    let centers: Vec<f64> = (0..axis.non_empty()).map(|i| axis.center(i)).collect();
    let first = centers[0];
    let last = centers[centers.len() - 1];

    let mut k = 0;
    (0..axis.len())
        .map(|i| {
            let p = i as f64 + 0.5;
            if p <= first {
                return Bracket::clamped(0);
            }
            if p >= last {
                return Bracket::clamped(centers.len() - 1);
            }
            while centers[k + 1] <= p {
                k += 1;
            }
            Bracket {
                lo: k,
                hi: k + 1,
                weight: (p - centers[k]) / (centers[k + 1] - centers[k]),
            }
        })
        .collect()
}

/// Produce the enhanced plane by blending the four surrounding LUTs per sample.
pub fn interpolate<T: Sample>(plane: &Plane<T>, luts: &TileLuts<T>) -> Plane<T> {
    let cols = axis_brackets(&luts.grid().cols);
    let rows = axis_brackets(&luts.grid().rows);
    let width = plane.width() as usize;
    let max = (plane.levels() - 1) as f64;

    let mut out = vec![T::default(); plane.as_slice().len()];

    #[cfg(feature = "parallel")]
    let out_rows = out.par_chunks_mut(width);
    #[cfg(not(feature = "parallel"))]
    let out_rows = out.chunks_mut(width);

    out_rows.enumerate().for_each(|(y, dst)| {
        let rb = rows[y];
        let top = luts.tile_row(rb.lo);
        let bottom = luts.tile_row(rb.hi);
        let ay = rb.weight;

        for ((out, &src), cb) in dst.iter_mut().zip(plane.row(y as u32)).zip(&cols) {
            let v = src.to_level();
            let ax = cb.weight;

            let tl = top[[cb.lo, v]].to_level() as f64;
            let tr = top[[cb.hi, v]].to_level() as f64;
            let bl = bottom[[cb.lo, v]].to_level() as f64;
            let br = bottom[[cb.hi, v]].to_level() as f64;

            let upper = tl * (1.0 - ax) + tr * ax;
            let lower = bl * (1.0 - ax) + br * ax;
            let result = upper * (1.0 - ay) + lower * ay;

            *out = T::from_level((result + 0.5).clamp(0.0, max) as usize);
        }
    });

    Plane::from_parts(plane.width(), plane.height(), plane.levels(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_clamp_at_edges() {
        let axis = AxisPartition::new(8, 2).unwrap();
        let b = axis_brackets(&axis);
        // centers at 2.0 and 6.0
        assert_eq!(b[0], Bracket::clamped(0));
        assert_eq!(b[1], Bracket::clamped(0));
        assert_eq!(b[2].lo, 0);
        assert_eq!(b[2].hi, 1);
        assert!((b[2].weight - 0.125).abs() < 1e-12);
        assert!((b[5].weight - 0.875).abs() < 1e-12);
        assert_eq!(b[6], Bracket::clamped(1));
        assert_eq!(b[7], Bracket::clamped(1));
    }

    #[test]
    fn test_single_tile_always_clamps() {
        let axis = AxisPartition::new(5, 1).unwrap();
        assert!(axis_brackets(&axis)
            .iter()
            .all(|b| *b == Bracket::clamped(0)));
    }

    #[test]
    fn test_empty_trailing_tile_gets_no_weight() {
        let axis = AxisPartition::new(9, 6).unwrap();
        let b = axis_brackets(&axis);
        assert!(b.iter().all(|b| b.lo < 5 && b.hi < 5));
        assert_eq!(b[8], Bracket::clamped(4));
    }

    #[test]
    fn test_uneven_trailing_tile_uses_geometric_center() {
        // spans 0..3, 3..6, 6..9, 9..10 -> centers 1.5, 4.5, 7.5, 9.5
        let axis = AxisPartition::new(10, 4).unwrap();
        let b = axis_brackets(&axis);
        assert_eq!((b[8].lo, b[8].hi), (2, 3));
        assert!((b[8].weight - 0.5).abs() < 1e-12);
        assert_eq!(b[9], Bracket::clamped(3));
    }

    #[test]
    fn test_weights_stay_in_unit_interval() {
        for (len, n) in [(7, 3), (100, 8), (13, 13), (64, 5)] {
            let axis = AxisPartition::new(len, n).unwrap();
            for b in axis_brackets(&axis) {
                assert!((0.0..=1.0).contains(&b.weight));
                assert!(b.hi == b.lo || b.hi == b.lo + 1);
            }
        }
    }
}

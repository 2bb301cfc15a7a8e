/// CLAHE (Contrast Limited Adaptive Histogram Equalization)
///
/// - Split the plane into a grid of tiles
/// - Per-tile histogram, clipped at `clip_limit * tile_pixels / levels` with the
///   excess redistributed
/// - Per-tile LUT from the clipped CDF
/// - Bilinear interpolation between the LUTs of the four nearest tile centers
use crate::error::Result;
use crate::interpolate::interpolate;
use crate::mapping::build_tile_luts;
use crate::params::ClaheParams;
use crate::plane::{Plane, Sample};

/// Enhance `plane`, returning a new plane with the same dimensions and domain.
///
/// Fails with `InvalidConfiguration` for a zero grid dimension or a NaN clip
/// limit, before any pixel is read.
pub fn clahe<T: Sample>(plane: &Plane<T>, params: &ClaheParams) -> Result<Plane<T>> {
    let luts = build_tile_luts(plane, params)?;
    log::debug!(
        "clahe {}x{} levels={} grid={} clip={}",
        plane.width(),
        plane.height(),
        plane.levels(),
        params.grid,
        params.clip_limit
    );
    Ok(interpolate(plane, &luts))
}

/// Convenience wrapper for a raw 8-bit buffer.
pub fn clahe_gray(gray: &[u8], width: u32, height: u32, params: &ClaheParams) -> Result<Vec<u8>> {
    let plane = Plane::new(width, height, gray.to_vec())?;
    Ok(clahe(&plane, params)?.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::params::GridSize;

    #[test]
    fn test_uniform_image() {
        // A uniform image maps every pixel to the same value
        let gray = vec![128u8; 64 * 64];
        let params = ClaheParams::new(4.0, GridSize::square(8));
        let result = clahe_gray(&gray, 64, 64, &params).unwrap();
        let first = result[0];
        assert!(result.iter().all(|&v| v == first));
    }

    #[test]
    fn test_output_keeps_dimensions_and_domain() {
        let data: Vec<u16> = (0..30 * 20).map(|i| ((i * 131) % 4096) as u16).collect();
        let plane = Plane::with_levels(30, 20, 4096, data).unwrap();
        let out = clahe(&plane, &ClaheParams::new(3.0, GridSize::new(4, 3))).unwrap();
        assert_eq!(out.dimensions(), (30, 20));
        assert_eq!(out.levels(), 4096);
        assert!(out.as_slice().iter().all(|&v| v < 4096));
    }

    #[test]
    fn test_zero_grid_is_rejected() {
        let params = ClaheParams::new(2.0, GridSize::new(0, 4));
        let err = clahe_gray(&[0; 16], 4, 4, &params).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unclipped_gradient_is_stretched() {
        // Values 100..=107 in 8-column bands. Without clipping each tile of the
        // 2x2 grid stretches its four values over the full range.
        let (w, h) = (64u32, 64u32);
        let gray: Vec<u8> = (0..w * h).map(|i| 100 + ((i % w) / 8) as u8).collect();
        let out = clahe_gray(&gray, w, h, &ClaheParams::new(0.0, GridSize::square(2))).unwrap();
        assert_eq!(out[0], 64);
        assert_eq!(out[(w - 1) as usize], 255);
    }
}

/// Pixel-by-pixel comparison of two images, e.g. against a reference CLAHE output.
use image::{DynamicImage, GenericImageView, RgbImage};

/// Per-channel error statistics over RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDiff {
    pub width: u32,
    pub height: u32,
    pub exact_matches: u64,
    pub mean_abs_error: [f64; 3],
    pub max_error: [u32; 3],
}

impl ImageDiff {
    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn match_percent(&self) -> f64 {
        self.exact_matches as f64 / self.total_pixels() as f64 * 100.0
    }

    pub fn is_identical(&self) -> bool {
        self.exact_matches == self.total_pixels()
    }
}

/// Outcome of comparing two images.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    DimensionMismatch {
        a: (u32, u32),
        b: (u32, u32),
    },
    Compared {
        diff: ImageDiff,
        /// Absolute difference amplified 4x, when requested.
        visual: Option<RgbImage>,
    },
}

/// Compare `a` and `b` in RGB. `visual` also renders a difference image.
pub fn compare_images(a: &DynamicImage, b: &DynamicImage, visual: bool) -> Comparison {
    let (wa, ha) = a.dimensions();
    let (wb, hb) = b.dimensions();
    if (wa, ha) != (wb, hb) {
        return Comparison::DimensionMismatch {
            a: (wa, ha),
            b: (wb, hb),
        };
    }

    let rgb_a = a.to_rgb8();
    let rgb_b = b.to_rgb8();
    let mut visual = visual.then(|| RgbImage::new(wa, ha));

    let mut exact_matches = 0u64;
    let mut sum_abs_error = [0u64; 3];
    let mut max_error = [0u32; 3];

    for (x, y, pa) in rgb_a.enumerate_pixels() {
        let pb = rgb_b.get_pixel(x, y);
        let mut pixel_match = true;
        for c in 0..3 {
            let diff = (pa[c] as i32 - pb[c] as i32).unsigned_abs();
            pixel_match &= diff == 0;
            sum_abs_error[c] += diff as u64;
            max_error[c] = max_error[c].max(diff);

            if let Some(ref mut img) = visual {
                img.get_pixel_mut(x, y)[c] = (diff * 4).min(255) as u8;
            }
        }
        exact_matches += u64::from(pixel_match);
    }

    let total = (wa as u64 * ha as u64).max(1) as f64;
    let diff = ImageDiff {
        width: wa,
        height: ha,
        exact_matches,
        mean_abs_error: sum_abs_error.map(|s| s as f64 / total),
        max_error,
    };
    Comparison::Compared { diff, visual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_identical_images() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        match compare_images(&img, &img, false) {
            Comparison::Compared { diff, visual } => {
                assert!(diff.is_identical());
                assert_eq!(diff.match_percent(), 100.0);
                assert!(visual.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_statistics() {
        let a = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, Rgb([10, 10, 10])));
        let mut b = RgbImage::from_pixel(2, 1, Rgb([10, 10, 10]));
        b.put_pixel(1, 0, Rgb([20, 10, 0]));
        match compare_images(&a, &DynamicImage::ImageRgb8(b), true) {
            Comparison::Compared { diff, visual } => {
                assert_eq!(diff.exact_matches, 1);
                assert_eq!(diff.max_error, [10, 0, 10]);
                assert_eq!(diff.mean_abs_error, [5.0, 0.0, 5.0]);
                let visual = visual.unwrap();
                assert_eq!(visual.get_pixel(1, 0), &Rgb([40, 0, 40]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let b = DynamicImage::ImageRgb8(RgbImage::new(3, 2));
        assert_eq!(
            compare_images(&a, &b, false),
            Comparison::DimensionMismatch { a: (2, 2), b: (3, 2) }
        );
    }
}

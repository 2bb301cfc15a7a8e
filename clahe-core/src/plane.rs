/// Single-channel intensity planes.
///
/// A plane is `width * height` samples in row-major order with a known domain
/// `[0, levels - 1]`. The transform never mutates its input plane.
use image::{GrayImage, ImageBuffer, Luma};

use crate::error::{Error, Result};

/// Integer sample types a plane can hold.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Number of distinct values the type can represent.
    const CAPACITY: usize;

    fn to_level(self) -> usize;

    /// `level` must be below `CAPACITY`.
    fn from_level(level: usize) -> Self;
}

impl Sample for u8 {
    const CAPACITY: usize = 256;

    #[inline]
    fn to_level(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_level(level: usize) -> Self {
        level as u8
    }
}

impl Sample for u16 {
    const CAPACITY: usize = 65536;

    #[inline]
    fn to_level(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_level(level: usize) -> Self {
        level as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane<T: Sample> {
    width: u32,
    height: u32,
    levels: usize,
    data: Vec<T>,
}

impl<T: Sample> Plane<T> {
    /// Wrap `data` as a plane using the full domain of `T`.
    pub fn new(width: u32, height: u32, data: Vec<T>) -> Result<Self> {
        Self::with_levels(width, height, T::CAPACITY, data)
    }

    /// Wrap `data` as a plane whose samples lie in `[0, levels - 1]`.
    ///
    /// Useful for e.g. 12-bit data carried in `u16` (`levels = 4096`).
    pub fn with_levels(width: u32, height: u32, levels: usize, data: Vec<T>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "plane must be non-empty, got {}x{}",
                width, height
            )));
        }
        if levels == 0 || levels > T::CAPACITY {
            return Err(Error::invalid(format!(
                "intensity levels must be in 1..={}, got {}",
                T::CAPACITY,
                levels
            )));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        if let Some(pos) = data.iter().position(|s| s.to_level() >= levels) {
            return Err(Error::invalid(format!(
                "sample {} at index {} is outside [0, {}]",
                data[pos].to_level(),
                pos,
                levels - 1
            )));
        }

        Ok(Self {
            width,
            height,
            levels,
            data,
        })
    }

    /// Construct without validation. Callers guarantee the invariants hold.
    pub(crate) fn from_parts(width: u32, height: u32, levels: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            levels,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn row(&self, y: u32) -> &[T] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }
}

impl<T> Plane<T>
where
    T: Sample + image::Primitive,
{
    /// Copy a single-channel `image` buffer into a plane.
    pub fn from_luma(img: &ImageBuffer<Luma<T>, Vec<T>>) -> Result<Self> {
        let (w, h) = img.dimensions();
        Self::new(w, h, img.as_raw().clone())
    }

    pub fn into_luma(self) -> Result<ImageBuffer<Luma<T>, Vec<T>>> {
        let (w, h) = (self.width, self.height);
        let actual = self.data.len();
        ImageBuffer::from_raw(w, h, self.data).ok_or(Error::DimensionMismatch {
            expected: w as usize * h as usize,
            actual,
        })
    }
}

impl TryFrom<&GrayImage> for Plane<u8> {
    type Error = Error;

    fn try_from(img: &GrayImage) -> Result<Self> {
        Plane::from_luma(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_plane() {
        let err = Plane::<u8>::new(0, 4, vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Plane::<u8>::new(3, 3, vec![0; 8]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 9,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_rejects_samples_outside_domain() {
        let err = Plane::<u16>::with_levels(2, 1, 4096, vec![10, 4096]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_levels_beyond_capacity() {
        assert!(Plane::<u8>::with_levels(1, 1, 257, vec![0]).is_err());
        assert!(Plane::<u8>::with_levels(1, 1, 0, vec![0]).is_err());
    }

    #[test]
    fn test_row_and_get() {
        let plane = Plane::<u8>::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(plane.row(1), &[4, 5, 6]);
        assert_eq!(plane.get(2, 0), 3);
        assert_eq!(plane.levels(), 256);
    }

    #[test]
    fn test_luma_round_trip() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let plane = Plane::try_from(&img).unwrap();
        assert_eq!(plane.dimensions(), (4, 3));
        assert_eq!(plane.into_luma().unwrap(), img);
    }
}

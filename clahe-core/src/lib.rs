//! Contrast Limited Adaptive Histogram Equalization on intensity planes, plus
//! the adapters that feed it from and back into images.

pub mod clahe;
pub mod color;
pub mod compare;
pub mod error;
pub mod exif_orientation;
pub mod histogram;
pub mod interpolate;
pub mod mapping;
pub mod params;
pub mod pipeline;
pub mod plane;
pub mod preview;
pub mod tiles;

pub use crate::clahe::{clahe, clahe_gray};
pub use crate::color::ColorMode;
pub use crate::error::{Error, Result};
pub use crate::mapping::{build_tile_luts, TileLuts};
pub use crate::params::{ClaheParams, GridSize};
pub use crate::plane::{Plane, Sample};

/// CLAHE parameters: tile grid and clip factor, with named presets.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of tiles along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
}

impl GridSize {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub const fn square(n: u32) -> Self {
        Self { x: n, y: n }
    }

    pub fn validate(&self) -> Result<()> {
        if self.x == 0 || self.y == 0 {
            return Err(Error::invalid(format!(
                "tile grid must be at least 1x1, got {}",
                self
            )));
        }
        Ok(())
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::square(8)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Parses `"8x8"`, `"16X4"` or a single `"8"` (square grid).
impl FromStr for GridSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| Error::invalid(format!("invalid grid size '{}'", s)))
        };

        match s.split_once(|c: char| c == 'x' || c == 'X') {
            Some((x, y)) => Ok(Self::new(parse(x)?, parse(y)?)),
            None => Ok(Self::square(parse(s)?)),
        }
    }
}

/// Parameters for one CLAHE invocation.
///
/// `clip_limit` is the clip factor relative to a flat histogram: a bin may hold at
/// most `clip_limit * tile_pixels / levels` counts. Values `<= 0` or `+inf`
/// disable clipping (plain adaptive histogram equalization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    pub clip_limit: f64,
    pub grid: GridSize,
}

/// Config-file form of [`ClaheParams`] where every field is optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamsOverride {
    clip_limit: Option<f64>,
    grid: Option<GridSize>,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self::standard()
    }
}

impl ClaheParams {
    pub fn new(clip_limit: f64, grid: GridSize) -> Self {
        Self { clip_limit, grid }
    }

    /// Clip 2.0 on an 8x8 grid.
    pub fn standard() -> Self {
        Self {
            clip_limit: 2.0,
            grid: GridSize::square(8),
        }
    }

    /// Stronger contrast for underexposed images.
    pub fn dark() -> Self {
        Self {
            clip_limit: 3.5,
            grid: GridSize::square(8),
        }
    }

    /// Gentle contrast for bright images.
    pub fn bright() -> Self {
        Self {
            clip_limit: 1.5,
            grid: GridSize::square(8),
        }
    }

    /// Large tiles: broad regional contrast.
    pub fn coarse() -> Self {
        Self {
            clip_limit: 2.0,
            grid: GridSize::square(4),
        }
    }

    /// Small tiles: fine local detail.
    pub fn fine() -> Self {
        Self {
            clip_limit: 2.0,
            grid: GridSize::square(16),
        }
    }

    pub fn from_preset(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "dark" => Some(Self::dark()),
            "bright" => Some(Self::bright()),
            "coarse" => Some(Self::coarse()),
            "fine" => Some(Self::fine()),
            _ => None,
        }
    }

    pub fn all_presets() -> Vec<(&'static str, Self)> {
        vec![
            ("standard", Self::standard()),
            ("dark", Self::dark()),
            ("bright", Self::bright()),
            ("coarse", Self::coarse()),
            ("fine", Self::fine()),
        ]
    }

    /// Overlay the fields present in a JSON document onto `self`.
    ///
    /// `{"clip_limit": 3.0}` keeps the current grid; `{}` changes nothing.
    pub fn with_json(self, json: &str) -> Result<Self> {
        let overrides: ParamsOverride = serde_json::from_str(json)?;
        Ok(Self {
            clip_limit: overrides.clip_limit.unwrap_or(self.clip_limit),
            grid: overrides.grid.unwrap_or(self.grid),
        })
    }

    pub fn with_json_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        self.with_json(&text)
    }

    pub fn with_clip_limit(mut self, clip_limit: f64) -> Self {
        self.clip_limit = clip_limit;
        self
    }

    pub fn with_grid(mut self, grid: GridSize) -> Self {
        self.grid = grid;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if self.clip_limit.is_nan() {
            return Err(Error::invalid("clip limit must be a number, got NaN"));
        }
        Ok(())
    }
}

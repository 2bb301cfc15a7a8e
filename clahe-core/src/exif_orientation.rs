/// EXIF orientation correction applied when images are loaded.
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

use image::DynamicImage;

/// The eight EXIF orientation values (tag 0x0112).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    /// Flip horizontal + rotate 270° CW
    Transpose,
    Rotate90,
    /// Flip horizontal + rotate 90° CW
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_exif(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Normal),
            2 => Some(Self::FlipHorizontal),
            3 => Some(Self::Rotate180),
            4 => Some(Self::FlipVertical),
            5 => Some(Self::Transpose),
            6 => Some(Self::Rotate90),
            7 => Some(Self::Transverse),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }

    fn read<R: BufRead + Seek>(reader: &mut R) -> Option<Self> {
        let exif = exif::Reader::new().read_from_container(reader).ok()?;
        let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
        Self::from_exif(field.value.get_uint(0)?)
    }

    /// Orientation stored in the file at `path`, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file = std::fs::File::open(path).ok()?;
        Self::read(&mut BufReader::new(file))
    }

    /// Orientation stored in an encoded image, if any.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::read(&mut Cursor::new(bytes))
    }

    /// Transform `img` so it displays upright.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => img,
            Self::FlipHorizontal => img.fliph(),
            Self::Rotate180 => img.rotate180(),
            Self::FlipVertical => img.flipv(),
            Self::Transpose => img.rotate270().fliph(),
            Self::Rotate90 => img.rotate90(),
            Self::Transverse => img.rotate90().fliph(),
            Self::Rotate270 => img.rotate270(),
        }
    }
}

/// Correct a freshly loaded image using the EXIF data of its source file.
/// Images without readable orientation are returned unchanged.
pub fn apply_exif_orientation(img: DynamicImage, path: &Path) -> DynamicImage {
    match Orientation::from_path(path) {
        Some(orientation) => orientation.apply(img),
        None => img,
    }
}

/// Same as [`apply_exif_orientation`] for an image decoded from `bytes`.
pub fn apply_exif_orientation_from_bytes(img: DynamicImage, bytes: &[u8]) -> DynamicImage {
    match Orientation::from_bytes(bytes) {
        Some(orientation) => orientation.apply(img),
        None => img,
    }
}

/// Image-level processing:
/// load (EXIF-corrected) -> extract intensity plane(s) -> CLAHE -> reassemble -> save
use std::path::Path;

use image::{DynamicImage, GrayAlphaImage, ImageFormat, LumaA};

use crate::clahe::clahe;
use crate::color::{extract_channel, insert_channel, rgb_to_luma, ColorMode, LabSplit};
use crate::error::Result;
use crate::exif_orientation::apply_exif_orientation;
use crate::params::ClaheParams;
use crate::plane::{Plane, Sample};

/// Enhance channel `index` of an interleaved buffer in place.
fn enhance_channel<T: Sample>(
    pixels: &mut [T],
    channels: usize,
    index: usize,
    width: u32,
    height: u32,
    params: &ClaheParams,
) -> Result<()> {
    let plane = extract_channel(pixels, channels, index, width, height)?;
    let enhanced = clahe(&plane, params)?;
    insert_channel(&enhanced, pixels, channels, index)
}

/// Grayscale inputs keep their bit depth and alpha.
fn enhance_gray(img: &DynamicImage, params: &ClaheParams) -> Result<DynamicImage> {
    let (w, h) = (img.width(), img.height());
    let out = match img {
        DynamicImage::ImageLuma16(buf) => {
            let enhanced = clahe(&Plane::from_luma(buf)?, params)?;
            DynamicImage::ImageLuma16(enhanced.into_luma()?)
        }
        DynamicImage::ImageLumaA16(buf) => {
            let mut buf = buf.clone();
            enhance_channel(&mut *buf, 2, 0, w, h, params)?;
            DynamicImage::ImageLumaA16(buf)
        }
        DynamicImage::ImageLumaA8(buf) => {
            let mut buf = buf.clone();
            enhance_channel(&mut *buf, 2, 0, w, h, params)?;
            DynamicImage::ImageLumaA8(buf)
        }
        other => {
            let enhanced = clahe(&Plane::from_luma(&other.to_luma8())?, params)?;
            DynamicImage::ImageLuma8(enhanced.into_luma()?)
        }
    };
    Ok(out)
}

/// Luma mode on a colour image: BT.601 grayscale, alpha carried over.
fn enhance_luma(img: &DynamicImage, params: &ClaheParams) -> Result<DynamicImage> {
    let (w, h) = (img.width(), img.height());
    let rgba = img.to_rgba8();
    let gray = rgb_to_luma(rgba.as_raw(), 4, w, h)?;
    let enhanced = clahe(&gray, params)?;

    if !img.color().has_alpha() {
        return Ok(DynamicImage::ImageLuma8(enhanced.into_luma()?));
    }

    let buf = GrayAlphaImage::from_fn(w, h, |x, y| {
        LumaA([enhanced.get(x, y), rgba.get_pixel(x, y)[3]])
    });
    Ok(DynamicImage::ImageLumaA8(buf))
}

/// Enhance an image according to `mode`.
///
/// Grayscale images are always processed on their single channel, at their
/// native bit depth. Colour images are reduced to 8 bits per channel.
pub fn enhance_image(
    img: &DynamicImage,
    params: &ClaheParams,
    mode: ColorMode,
) -> Result<DynamicImage> {
    params.validate()?;

    if !img.color().has_color() {
        return enhance_gray(img, params);
    }

    let (w, h) = (img.width(), img.height());
    let has_alpha = img.color().has_alpha();

    match mode {
        ColorMode::Luma => enhance_luma(img, params),
        ColorMode::Lab => {
            if has_alpha {
                let mut buf = img.to_rgba8();
                let split = LabSplit::new(&buf, 4, w, h)?;
                let lightness = clahe(&split.lightness, params)?;
                split.merge_into(&lightness, &mut buf, 4)?;
                Ok(DynamicImage::ImageRgba8(buf))
            } else {
                let mut buf = img.to_rgb8();
                let split = LabSplit::new(&buf, 3, w, h)?;
                let lightness = clahe(&split.lightness, params)?;
                split.merge_into(&lightness, &mut buf, 3)?;
                Ok(DynamicImage::ImageRgb8(buf))
            }
        }
        ColorMode::Rgb => {
            if has_alpha {
                let mut buf = img.to_rgba8();
                for c in 0..3 {
                    enhance_channel(&mut *buf, 4, c, w, h, params)?;
                }
                Ok(DynamicImage::ImageRgba8(buf))
            } else {
                let mut buf = img.to_rgb8();
                for c in 0..3 {
                    enhance_channel(&mut *buf, 3, c, w, h, params)?;
                }
                Ok(DynamicImage::ImageRgb8(buf))
            }
        }
    }
}

/// Open an image and correct its EXIF orientation.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path)?;
    Ok(apply_exif_orientation(img, path))
}

/// Save `img`, dropping alpha for formats that cannot store it.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)?;
    let needs_rgb = matches!(format, ImageFormat::Jpeg) && img.color().has_alpha();
    let needs_gray8 = matches!(format, ImageFormat::Jpeg)
        && matches!(img, DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_));

    if needs_gray8 {
        DynamicImage::ImageLuma8(img.to_luma8()).save_with_format(path, format)?;
    } else if needs_rgb {
        DynamicImage::ImageRgb8(img.to_rgb8()).save_with_format(path, format)?;
    } else {
        img.save_with_format(path, format)?;
    }
    Ok(())
}

/// Load, enhance and save a single image file.
pub fn process_file(
    input: &Path,
    output: &Path,
    params: &ClaheParams,
    mode: ColorMode,
) -> Result<()> {
    params.validate()?;
    let img = load_image(input)?;
    let result = enhance_image(&img, params, mode)?;
    save_image(&result, output)?;
    log::debug!("{} -> {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image::{ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient_rgb(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = 90 + ((x + y) % 40) as u8;
            Rgb([v, v / 2 + 40, 200 - v / 3])
        })
    }

    #[test]
    fn test_lab_mode_keeps_alpha_and_size() {
        let img = RgbaImage::from_fn(20, 12, |x, y| {
            Rgba([(x * 10) as u8, (y * 20) as u8, 100, (x + y) as u8])
        });
        let params = ClaheParams::standard();
        let out = enhance_image(&DynamicImage::ImageRgba8(img.clone()), &params, ColorMode::Lab)
            .unwrap();
        let out = out.as_rgba8().unwrap();
        assert_eq!(out.dimensions(), (20, 12));
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn test_rgb_mode_without_alpha_stays_rgb() {
        let img = DynamicImage::ImageRgb8(gradient_rgb(16, 16));
        let out = enhance_image(&img, &ClaheParams::standard(), ColorMode::Rgb).unwrap();
        assert!(out.as_rgb8().is_some());
    }

    #[test]
    fn test_rgb_mode_matches_per_channel_clahe() {
        let img = gradient_rgb(16, 8);
        let params = ClaheParams::standard();
        let out = enhance_image(&DynamicImage::ImageRgb8(img.clone()), &params, ColorMode::Rgb)
            .unwrap();
        let out = out.to_rgb8();

        let green = extract_channel(img.as_raw().as_slice(), 3, 1, 16, 8).unwrap();
        let expected = clahe(&green, &params).unwrap();
        let actual: Vec<u8> = out.pixels().map(|p| p[1]).collect();
        assert_eq!(actual, expected.into_vec());
    }

    #[test]
    fn test_luma_mode_on_color_gives_gray() {
        let img = DynamicImage::ImageRgb8(gradient_rgb(16, 16));
        let out = enhance_image(&img, &ClaheParams::standard(), ColorMode::Luma).unwrap();
        assert!(out.as_luma8().is_some());

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 77])));
        let out = enhance_image(&rgba, &ClaheParams::standard(), ColorMode::Luma).unwrap();
        let la = out.as_luma_alpha8().unwrap();
        assert!(la.pixels().all(|p| p[1] == 77));
    }

    #[test]
    fn test_sixteen_bit_gray_keeps_depth() {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(32, 32, |x, y| Luma([(x * 1000 + y * 37) as u16]));
        let params = ClaheParams::standard();
        let out = enhance_image(&DynamicImage::ImageLuma16(buf), &params, ColorMode::Lab).unwrap();
        assert!(out.as_luma16().is_some());
    }

    #[test]
    fn test_gray_alpha_keeps_alpha() {
        let buf: GrayAlphaImage = ImageBuffer::from_fn(8, 8, |x, _| LumaA([(x * 20) as u8, 9]));
        let params = ClaheParams::standard();
        let out = enhance_image(&DynamicImage::ImageLumaA8(buf), &params, ColorMode::Rgb).unwrap();
        assert!(out.as_luma_alpha8().unwrap().pixels().all(|p| p[1] == 9));
    }

    #[test]
    fn test_process_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.jpg");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([40, 80, 120, 200])))
            .save(&input)
            .unwrap();

        process_file(&input, &output, &ClaheParams::standard(), ColorMode::Lab).unwrap();
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (10, 10));
    }

    #[test]
    fn test_invalid_params_fail_before_io() {
        let params = ClaheParams::standard().with_clip_limit(f64::NAN);
        let err = process_file(
            Path::new("/nonexistent/a.png"),
            Path::new("/nonexistent/b.png"),
            &params,
            ColorMode::Lab,
        );
        assert!(matches!(err, Err(Error::InvalidConfiguration(_))));

        let img = DynamicImage::ImageRgb8(gradient_rgb(4, 4));
        assert!(matches!(
            enhance_image(&img, &params, ColorMode::Lab),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}

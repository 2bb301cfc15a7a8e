use clahe_core::exif_orientation::apply_exif_orientation_from_bytes;
use clahe_core::pipeline::enhance_image;
use clahe_core::{ClaheParams as CoreParams, ColorMode, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use wasm_bindgen::prelude::*;

use crate::params::ClaheParams;
use crate::utils::{console_log, to_js_error};

/// Decode, correct orientation, enhance and re-encode as PNG.
fn enhance_encoded(image_bytes: &[u8], params: &CoreParams, mode: ColorMode) -> Result<Vec<u8>> {
    let img = image::load_from_memory(image_bytes)?;
    let img = apply_exif_orientation_from_bytes(img, image_bytes);
    let result = enhance_image(&img, params, mode)?;

    let mut output = Vec::new();
    result.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

/// Enhance raw RGBA pixels (canvas `ImageData` layout).
fn enhance_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    params: &CoreParams,
    mode: ColorMode,
) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    let img = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(
        clahe_core::Error::DimensionMismatch {
            expected,
            actual: pixels.len(),
        },
    )?;
    let result = enhance_image(&DynamicImage::ImageRgba8(img), params, mode)?;
    Ok(result.to_rgba8().into_raw())
}

/// Browser entry point for CLAHE.
#[wasm_bindgen]
pub struct ClaheProcessor;

#[wasm_bindgen]
impl ClaheProcessor {
    /// Enhance an encoded image.
    ///
    /// # Arguments
    /// * `image_bytes` - Input image as byte array (PNG, JPEG, WebP, etc.)
    /// * `params` - Processing parameters
    ///
    /// # Returns
    /// PNG-encoded image bytes
    #[wasm_bindgen(js_name = processImage)]
    pub fn process_image(
        image_bytes: &[u8],
        params: &ClaheParams,
    ) -> std::result::Result<Vec<u8>, JsValue> {
        console_log!(
            "clahe: {} bytes, clip limit {}, grid {}, mode {}",
            image_bytes.len(),
            params.inner.clip_limit,
            params.inner.grid,
            params.mode
        );
        enhance_encoded(image_bytes, &params.inner, params.mode)
            .map_err(|e| to_js_error("Failed to process image", e))
    }

    /// Enhance RGBA pixels in place of a canvas round trip through PNG.
    #[wasm_bindgen(js_name = processRgba)]
    pub fn process_rgba(
        pixels: &[u8],
        width: u32,
        height: u32,
        params: &ClaheParams,
    ) -> std::result::Result<js_sys::Uint8ClampedArray, JsValue> {
        let out = enhance_rgba(pixels, width, height, &params.inner, params.mode)
            .map_err(|e| to_js_error("Failed to process pixels", e))?;
        Ok(js_sys::Uint8ClampedArray::from(out.as_slice()))
    }
}

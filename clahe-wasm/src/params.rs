use clahe_core::{ClaheParams as CoreParams, ColorMode, GridSize};
use wasm_bindgen::prelude::*;

use crate::utils::to_js_error;

/// CLAHE parameters plus the color handling mode.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy)]
pub struct ClaheParams {
    pub(crate) inner: CoreParams,
    pub(crate) mode: ColorMode,
}

impl ClaheParams {
    fn from_core(inner: CoreParams) -> Self {
        Self {
            inner,
            mode: ColorMode::default(),
        }
    }
}

#[wasm_bindgen]
impl ClaheParams {
    /// Create parameters with custom values. `clipLimit <= 0` disables clipping.
    #[wasm_bindgen(constructor)]
    pub fn new(clip_limit: f64, grid_x: u32, grid_y: u32) -> Result<ClaheParams, JsValue> {
        let inner = CoreParams::new(clip_limit, GridSize::new(grid_x, grid_y));
        inner
            .validate()
            .map_err(|e| to_js_error("Invalid parameters", e))?;
        Ok(Self::from_core(inner))
    }

    /// Standard preset: clip 2.0 on an 8x8 grid.
    pub fn standard() -> Self {
        Self::from_core(CoreParams::standard())
    }

    /// Stronger limit for underexposed images.
    pub fn dark() -> Self {
        Self::from_core(CoreParams::dark())
    }

    /// Gentle limit for bright or washed-out images.
    pub fn bright() -> Self {
        Self::from_core(CoreParams::bright())
    }

    pub fn coarse() -> Self {
        Self::from_core(CoreParams::coarse())
    }

    pub fn fine() -> Self {
        Self::from_core(CoreParams::fine())
    }

    /// Look up a preset by name.
    #[wasm_bindgen(js_name = fromPreset)]
    pub fn from_preset(name: &str) -> Result<ClaheParams, JsValue> {
        CoreParams::from_preset(name)
            .map(Self::from_core)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown preset: {}", name)))
    }

    /// Names accepted by `fromPreset`.
    #[wasm_bindgen(js_name = presetNames)]
    pub fn preset_names() -> js_sys::Array {
        CoreParams::all_presets()
            .into_iter()
            .map(|(name, _)| JsValue::from_str(name))
            .collect()
    }

    /// Color handling: "lab" (default), "rgb" or "luma".
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        self.mode = mode.parse().map_err(|e| to_js_error("Invalid mode", e))?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.mode.to_string()
    }

    #[wasm_bindgen(getter, js_name = clipLimit)]
    pub fn clip_limit(&self) -> f64 {
        self.inner.clip_limit
    }

    #[wasm_bindgen(getter, js_name = gridX)]
    pub fn grid_x(&self) -> u32 {
        self.inner.grid.x
    }

    #[wasm_bindgen(getter, js_name = gridY)]
    pub fn grid_y(&self) -> u32 {
        self.inner.grid.y
    }
}
